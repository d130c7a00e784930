use std::fmt;

/// When the device reports command results (`bkcmd`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnMode {
    /// Never reply.
    None = 0,
    /// Reply on success only.
    OnSuccess = 1,
    /// Reply on failure only (factory default).
    OnFailure = 2,
    /// Reply to every command. Request/response correlation relies on this.
    #[default]
    Always = 3,
}

/// Writable system-wide variables.
pub const SYSTEM_VARIABLES: [&str; 3] = ["sys0", "sys1", "sys2"];

/// An outbound ASCII command, without its delimiter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command(String);

impl Command {
    /// Wrap raw command text.
    pub fn raw(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// `name=value`.
    pub fn assign(name: &str, value: impl fmt::Display) -> Self {
        Self(format!("{}={value}", name.trim()))
    }

    /// `name=1` or `name=0`.
    pub fn assign_flag(name: &str, value: bool) -> Self {
        Self::assign(name, u8::from(value))
    }

    /// `get name`; the device answers with a `stringData` or `numericData` event.
    pub fn get(name: &str) -> Self {
        Self(format!("get {}", name.trim()))
    }

    /// `bkcmd=<mode>`.
    pub fn return_mode(mode: ReturnMode) -> Self {
        Self::assign("bkcmd", mode as u8)
    }

    /// `sleep=1` to sleep, `sleep=0` to wake and stay awake.
    pub fn sleep(enabled: bool) -> Self {
        Self::assign_flag("sleep", enabled)
    }

    /// `ranset min,max`: range used by the device's `rand` variable.
    pub fn random_range(min: u32, max: u32) -> Self {
        Self(format!("ranset {min},{max}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Command {
    fn from(text: &str) -> Self {
        Self::raw(text)
    }
}

impl From<String> for Command {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&String> for Command {
    fn from(text: &String) -> Self {
        Self(text.clone())
    }
}
