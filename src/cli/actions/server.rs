use crate::cli::actions::Action;
use crate::gardi;
use anyhow::Result;
use std::time::Duration;
use url::Url;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            request_timeout,
        } => {
            // Fail early on an unparseable DSN instead of deep inside the pool
            let dsn = Url::parse(&dsn)?;

            gardi::new(port, dsn.to_string(), Duration::from_secs(request_timeout)).await?;
        }
    }

    Ok(())
}
