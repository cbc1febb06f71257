pub mod accounts;
pub mod campaigns;
pub mod coordinator;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod token;

pub use error::ApiError;
pub use routes::{auth_router, campaign_router};
pub use state::{AppState, AppStateInner};
pub use token::TokenCodec;
