use crate::config::ToggleSource;
use crate::{Context, Error};
use poise::command;
use poise::serenity_prelude as serenity;

/// Basic ping command
/// This command is used to check if the bot is responsive.
#[command(prefix_command, slash_command, guild_only)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say("Pong!").await?;
    Ok(())
}

/// Inspect or flip a feature toggle.
/// Run without arguments to see the current toggle states.
#[command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    category = "Moderation"
)]
pub async fn toggle(
    ctx: Context<'_>,
    #[description = "Toggle name: auto_greet, auto_question or silence_breaker"] name: Option<
        String,
    >,
    #[description = "New state for the toggle"] value: Option<bool>,
) -> Result<(), Error> {
    let toggles = &ctx.data().toggles;

    if let (Some(name), Some(value)) = (name, value) {
        toggles.set(&name, value).await?;
        ctx.say(format!("Toggle `{name}` is now `{value}`")).await?;
        return Ok(());
    }

    let current = toggles.load().await;
    ctx.say(format!(
        "auto_greet: `{}`\nauto_question: `{}`\nsilence_breaker: `{}`",
        current.auto_greet, current.auto_question, current.silence_breaker
    ))
    .await?;
    Ok(())
}

/// Show how many warnings a user has accumulated.
#[command(
    slash_command,
    guild_only,
    required_permissions = "MODERATE_MEMBERS",
    category = "Moderation"
)]
pub async fn warnings(
    ctx: Context<'_>,
    #[description = "User to look up"] user: serenity::User,
) -> Result<(), Error> {
    let moderator = &ctx.data().moderator;
    let count = moderator.warning_count(user.id.get());

    if count == 0 {
        ctx.say(format!("{} has no warnings", user.name)).await?;
        return Ok(());
    }

    let mut reply = format!("{} has {count} warning(s):", user.name);
    for record in moderator.warnings_for(user.id.get()) {
        reply.push_str(&format!(
            "\n{}. {} — {}",
            record.count,
            record.reason,
            record.issued_at.format("%Y-%m-%d %H:%M UTC")
        ));
    }
    ctx.say(reply).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test that the ping command is properly defined
    #[test]
    fn test_ping_command_definition() {
        let cmd = ping();
        assert_eq!(cmd.name, "ping");
        assert!(
            cmd.description
                .unwrap_or_else(Default::default)
                .contains("check if the bot is responsive")
        );
        assert!(cmd.guild_only);
    }

    // This test verifies that the ping command can be executed
    #[test]
    fn test_ping_command_can_be_called() {
        // This test just verifies that the ping command exists and can be called
        // We don't actually execute it since that would require a real Discord context
        let cmd = ping();
        assert!(cmd.create_as_slash_command().is_some());
    }

    #[test]
    fn test_toggle_command_definition() {
        let cmd = toggle();
        assert_eq!(cmd.name, "toggle");
        assert!(cmd.guild_only);
        assert_eq!(cmd.parameters.len(), 2);
        assert!(cmd.parameters.iter().all(|p| !p.required));
    }

    #[test]
    fn test_warnings_command_definition() {
        let cmd = warnings();
        assert_eq!(cmd.name, "warnings");
        assert!(cmd.guild_only);
        assert_eq!(cmd.parameters.len(), 1);
        assert!(cmd.parameters[0].required);
    }
}
