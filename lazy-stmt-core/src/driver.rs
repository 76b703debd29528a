use crate::{Connection, Prepared, Result};
use std::{borrow::Cow, fmt::Debug, future::Future};

/// Backend connector.
pub trait Driver: Default + Debug + Send + Sync + 'static {
    /// Concrete connection.
    type Connection: Connection<Driver = Self>;
    /// Prepared statement handle.
    type Prepared: Prepared;

    /// Human-readable backend names, also accepted as URL schemes.
    const NAME: &'static [&'static str];

    /// Driver name (used in URLs).
    fn name(&self) -> &'static str {
        Self::NAME[0]
    }

    /// Connect to database `url`.
    ///
    /// The returned future must be awaited to obtain the connection object.
    /// Implementations may perform I/O or validation during connection.
    fn connect(&self, url: Cow<'static, str>) -> impl Future<Output = Result<Self::Connection>> {
        Self::Connection::connect(url)
    }
}
