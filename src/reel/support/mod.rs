pub mod ffmpeg;
#[cfg(test)]
pub mod testing;
pub mod timecode;
