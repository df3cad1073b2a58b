//! Device insight queries

use clap::{Args, Subcommand};

use dnac_connector::ids::EntityId;
use dnac_connector::operation::PageRequest;
use dnac_connector::traits::DeviceInsightOp;

use crate::commands::{connect, print_json};
use crate::error::{CliError, CliResult};

/// Query device insights
#[derive(Args, Debug)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Subcommand, Debug)]
pub enum DevicesCommand {
    /// List devices of a site still using SNMPv3 with DES privacy
    #[command(name = "snmpv3-des")]
    SnmpV3Des(SnmpV3DesArgs),
}

#[derive(Args, Debug)]
pub struct SnmpV3DesArgs {
    /// Site id
    #[arg(long)]
    pub site_id: String,

    /// Starting row number
    #[arg(long, default_value_t = 1)]
    pub offset: u32,

    /// Maximum number of devices to return
    #[arg(long, default_value_t = 500)]
    pub limit: u32,

    /// Sort attribute
    #[arg(long)]
    pub sort_by: Option<String>,

    /// Sort order (asc or desc)
    #[arg(long, requires = "sort_by")]
    pub order: Option<String>,
}

impl SnmpV3DesArgs {
    pub fn page(&self) -> CliResult<PageRequest> {
        if self.offset == 0 {
            return Err(CliError::Validation(
                "offset counts from 1".to_string(),
            ));
        }

        let page = PageRequest::new(self.offset, self.limit);
        Ok(match &self.sort_by {
            Some(sort_by) => {
                let order = self.order.as_deref().unwrap_or("asc").to_lowercase();
                if order != "asc" && order != "desc" {
                    return Err(CliError::Validation(format!(
                        "order must be 'asc' or 'desc', got '{order}'"
                    )));
                }
                page.sorted_by(sort_by, order)
            }
            None => page,
        })
    }
}

/// Execute a devices command
pub async fn execute(args: DevicesArgs) -> CliResult<()> {
    match args.command {
        DevicesCommand::SnmpV3Des(des_args) => {
            let page = des_args.page()?;
            let client = connect()?;
            let devices = client
                .devices_with_snmp_v3_des(&EntityId::new(&des_args.site_id), &page)
                .await?;

            tracing::info!(site_id = %des_args.site_id, count = devices.len(), "SNMPv3 DES devices listed");
            print_json(&devices)
        }
    }
}
