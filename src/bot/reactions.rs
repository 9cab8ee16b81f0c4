use serenity::model::{
    channel::{Reaction, ReactionType},
    id::{MessageId, UserId},
};

use crate::ui::panel::PanelControl;

/// Una reacción de usuario que corresponde a un control del panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlReaction {
    pub message_id: MessageId,
    pub user_id: UserId,
    pub control: PanelControl,
}

pub fn control_for(emoji: &ReactionType) -> Option<PanelControl> {
    match emoji {
        ReactionType::Unicode(emoji) => PanelControl::from_emoji(emoji),
        _ => None,
    }
}

/// Filtra las reacciones del propio bot, de otros bots y los emojis ajenos al panel
pub fn parse(reaction: &Reaction, bot_id: UserId) -> Option<ControlReaction> {
    let from_bot = reaction.member.as_ref().is_some_and(|member| member.user.bot);
    accept(reaction.user_id?, from_bot, bot_id, reaction.message_id, &reaction.emoji)
}

fn accept(
    user_id: UserId,
    from_bot: bool,
    bot_id: UserId,
    message_id: MessageId,
    emoji: &ReactionType,
) -> Option<ControlReaction> {
    if from_bot || user_id == bot_id {
        return None;
    }

    Some(ControlReaction {
        message_id,
        user_id,
        control: control_for(emoji)?,
    })
}
