use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};

/// Paleta de colores del bot
pub mod colors {
    use serenity::all::Colour;

    pub const MIX_GREEN: Colour = Colour::from_rgb(0, 255, 0);
}

const HELP_THUMBNAIL: &str = "https://i.imgur.com/3KbU5eN.png";
const STANDARD_FOOTER: &str = "Let's turn up the beats! 🎶";

/// Comandos y su descripción, en el orden en que se muestran
pub const COMMAND_LINES: [(&str, &str); 7] = [
    ("/play <song>", "Drop a new track"),
    ("/queue", "Check the lineup"),
    ("/skip", "Next track!"),
    ("/pause", "Break time"),
    ("/resume", "Back in action"),
    ("/stop", "Shut it down"),
    ("/help", "This menu"),
];

fn command_list() -> String {
    COMMAND_LINES
        .iter()
        .map(|(usage, description)| format!("`{usage}` - {description}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Embed de `/help`
pub fn create_help_embed() -> CreateEmbed {
    CreateEmbed::default()
        .title("🎧 Lucio's Mix Station")
        .color(colors::MIX_GREEN)
        .thumbnail(HELP_THUMBNAIL)
        .field("Track Controls:", command_list(), false)
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
        .timestamp(Timestamp::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_list_covers_every_command() {
        let list = command_list();
        for name in ["play", "queue", "skip", "pause", "resume", "stop", "help"] {
            assert!(list.contains(&format!("`/{name}")), "missing /{name}");
        }
        assert!(list.starts_with("`/play <song>` - Drop a new track\n"));
    }
}
