//! Tag membership queries and updates

use clap::{Args, Subcommand};
use serde_json::json;

use dnac_connector::ids::EntityId;
use dnac_connector::operation::{MembershipUpdate, TagMemberQuery};
use dnac_connector::traits::TagMemberOp;
use dnac_intent::{ExecutionHandle, PollPolicy, TaskPoller};

use crate::commands::{connect, print_json};
use crate::error::{CliError, CliResult};

/// Query and update tag membership
#[derive(Args, Debug)]
pub struct TagMembersArgs {
    #[command(subcommand)]
    pub command: TagMembersCommand,
}

#[derive(Subcommand, Debug)]
pub enum TagMembersCommand {
    /// List members of a tag
    List(MemberQueryArgs),

    /// Count members of a tag
    Count(MemberQueryArgs),

    /// List supported member types
    Types,

    /// Set the tags of one or more members
    Update(UpdateArgs),
}

#[derive(Args, Debug)]
pub struct MemberQueryArgs {
    /// Tag id
    #[arg(long)]
    pub tag_id: String,

    /// Member entity type (see `dnac tag-members types`)
    #[arg(long)]
    pub member_type: String,

    /// Starting row number
    #[arg(long)]
    pub offset: Option<u32>,

    /// Maximum number of members to return
    #[arg(long)]
    pub limit: Option<u32>,

    /// DYNAMIC, STATIC or MIXED
    #[arg(long)]
    pub association: Option<String>,

    /// Level filter
    #[arg(long)]
    pub level: Option<String>,
}

impl MemberQueryArgs {
    pub fn query(&self) -> TagMemberQuery {
        let mut query = TagMemberQuery::new(&self.member_type);
        query.offset = self.offset;
        query.limit = self.limit;
        if let Some(ref association) = self.association {
            query = query.with_association_type(association.to_uppercase());
        }
        if let Some(ref level) = self.level {
            query = query.with_level(level);
        }
        query
    }
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Member entity type
    #[arg(long)]
    pub member_type: String,

    /// `MEMBER_ID=TAG_ID[,TAG_ID...]`, repeatable
    #[arg(long = "member", required = true)]
    pub members: Vec<String>,
}

/// Parse `MEMBER_ID=TAG_ID[,TAG_ID...]` pairs into a membership update.
pub fn parse_membership(member_type: &str, members: &[String]) -> CliResult<MembershipUpdate> {
    let mut update = MembershipUpdate::new(member_type);

    for member in members {
        let (member_id, tags) = member.split_once('=').ok_or_else(|| {
            CliError::Validation(format!(
                "'{member}' must have the form MEMBER_ID=TAG_ID[,TAG_ID...]"
            ))
        })?;

        let member_id = member_id.trim();
        if member_id.is_empty() {
            return Err(CliError::Validation(format!(
                "'{member}' has an empty member id"
            )));
        }

        let tag_ids: Vec<String> = tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        update = update.with_member(member_id, tag_ids);
    }

    Ok(update)
}

/// Execute a tag-members command
pub async fn execute(args: TagMembersArgs) -> CliResult<()> {
    let client = connect()?;

    match args.command {
        TagMembersCommand::List(query_args) => {
            let members = client
                .list_members(&EntityId::new(&query_args.tag_id), &query_args.query())
                .await?;
            print_json(&members)
        }
        TagMembersCommand::Count(query_args) => {
            let count = client
                .count_members(&EntityId::new(&query_args.tag_id), &query_args.query())
                .await?;
            print_json(&json!({ "count": count }))
        }
        TagMembersCommand::Types => {
            let types = client.member_types().await?;
            print_json(&types)
        }
        TagMembersCommand::Update(update_args) => {
            let update = parse_membership(&update_args.member_type, &update_args.members)?;
            let accepted = client.update_membership(&update).await?;

            let mut handle = ExecutionHandle::from_accepted(&accepted);
            let detail = TaskPoller::new(PollPolicy::default())
                .await_completion(client.as_ref(), &mut handle)
                .await?;

            print_json(&json!({
                "changed": true,
                "msg": "Tag membership updated",
                "response": detail,
            }))
        }
    }
}
