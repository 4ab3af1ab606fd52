pub use crate::zfx_id::Id;
pub use crate::{Error, Result};

pub use actix::{Actor, Addr, AsyncContext, Context, Handler, Recipient};

pub use tokio::time::Duration;

pub use std::sync::Arc;

pub use crate::colored::Colorize;

pub use tracing::{debug, error, info, warn};
