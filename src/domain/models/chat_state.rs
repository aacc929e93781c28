use serde_derive::Deserialize;
use serde_derive::Serialize;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ChatState {
    #[default]
    Idle,
    Sending,
    Streaming,
    Failed,
}

impl ChatState {
    pub fn accepts_input(&self) -> bool {
        return *self == ChatState::Idle;
    }
}
