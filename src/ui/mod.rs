//! Lo que el bot muestra en Discord: mensajes con la voz del DJ, el embed de
//! ayuda y el panel de control por reacciones.

pub mod embeds;
pub mod messages;
pub mod panel;
