pub mod messages;
pub mod stream;

pub use messages::{
    decode, encode, AckMessage, ClearMessage, CustomMessage, DecodeError, DtmfMessage,
    MediaInputMessage, MediaOutputMessage, Message, MessageType, StartMessage,
};
pub use stream::{InputFormat, Media, Metadata, StreamConfig};
