use crate::{Driver, Error, Executor, Result, truncate_long};
use anyhow::Context;
use std::{
    borrow::Cow,
    future::{self, Future},
};
use url::Url;

/// A live database handle capable of executing queries.
///
/// Extends [`Executor`] with connection management.
///
/// # Lifecycle
/// - `connect` creates the underlying connection. It may eagerly
///   establish network I/O; always await it.
/// - `disconnect` releases it, dropping the connection has the same effect
///   for the drivers that do not need to await anything.
pub trait Connection: Executor {
    /// Validate the URL scheme against the driver names and parse it.
    ///
    /// `scheme://:memory:` is rewritten to `scheme://localhost?mode=memory`.
    fn sanitize_url(mut url: Cow<'static, str>) -> Result<Url>
    where
        Self: Sized,
    {
        let mut in_memory = false;
        if let Some((scheme, host)) = url.split_once("://")
            && host.starts_with(":memory:")
        {
            url = format!("{scheme}://localhost{}", &host[8..]).into();
            in_memory = true;
        }
        let context = || format!("While trying to connect to `{}`", truncate_long!(url));
        let names = <Self::Driver as Driver>::NAME;
        if !names
            .iter()
            .any(|name| url.starts_with(&format!("{name}://")))
        {
            let error = Error::msg(format!(
                "Connection URL must start with: {}",
                names
                    .iter()
                    .map(|v| format!("{v}://"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
            .context(context());
            log::error!("{:#}", error);
            return Err(error);
        }
        let mut result = Url::parse(&url).with_context(context)?;
        if in_memory {
            result.query_pairs_mut().append_pair("mode", "memory");
        }
        Ok(result)
    }

    /// Create a connection to the given URL.
    ///
    /// Implementations may perform I/O or validation during `connect`.
    /// Callers should treat this as a potentially expensive operation.
    fn connect(
        url: Cow<'static, str>,
    ) -> impl Future<Output = Result<<Self::Driver as Driver>::Connection>>
    where
        Self: Sized;

    /// Disconnect and release the underlying session.
    fn disconnect(self) -> impl Future<Output = Result<()>>
    where
        Self: Sized,
    {
        future::ready(Ok(()))
    }
}
