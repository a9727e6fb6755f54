mod accounts;
mod consistency;

pub use accounts::{cmd_create_admin, cmd_reset_password, cmd_security_log};
pub use consistency::{cmd_check, cmd_cleanup, cmd_delete_account};

use anyhow::Result;

use crate::config::Config;
use crate::db::Store;

pub(crate) async fn open_store(config: &Config) -> Result<Store> {
    Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await
}
