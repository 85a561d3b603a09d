pub mod button_monitor;
pub mod control;
pub mod now_playing;
pub mod player;
pub mod reader;
