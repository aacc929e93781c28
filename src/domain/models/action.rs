#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Free text, a picked quick-reply label, or a submitted form blob.
    SendMessage(String),
    NewChat(),
}
