pub mod inbound;
pub mod ledger;
pub mod outbound;
pub mod picking;
pub mod reports;
pub mod snapshot;
pub mod stock;
pub mod stock_move;
pub mod stock_taking;
