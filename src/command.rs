use crate::prelude::*;

#[derive(Clone, Debug)]
pub enum ChannelData {
    Command(Command),
    Shutdown,
}

/// A user-initiated request against the device, as a host shell would
/// submit it over `Channels::to_hub`.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Refresh,
    SetMode(u16),
    SetPoint(String, f64),
    SelectOption(String, String),
}

impl Command {
    pub fn is_write(&self) -> bool {
        !matches!(self, Command::Refresh)
    }

    pub fn key(&self) -> &str {
        use Command::*;

        match self {
            Refresh => "refresh",
            SetMode(_) => mode::MODE_KEY,
            SetPoint(key, _) => key,
            SelectOption(key, _) => key,
        }
    }

    pub fn to_result_topic(&self) -> String {
        use Command::*;

        let rest = match self {
            Refresh => "refresh".to_string(),
            SetMode(code) => format!("set/{}/{}", mode::MODE_KEY, code),
            SetPoint(key, _) => format!("set/{}", key),
            SelectOption(key, _) => format!("select/{}", key),
        };

        format!("result/{}", rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_topics() {
        assert_eq!(Command::Refresh.to_result_topic(), "result/refresh");
        assert_eq!(Command::SetMode(4).to_result_topic(), "result/set/ext_control_mode/4");
        assert_eq!(
            Command::SetPoint("charge_limit".into(), 2000.0).to_result_topic(),
            "result/set/charge_limit"
        );
        assert_eq!(
            Command::SelectOption("export_limit_enable".into(), "Enabled".into()).to_result_topic(),
            "result/select/export_limit_enable"
        );
    }

    #[test]
    fn only_refresh_is_not_a_write() {
        assert!(!Command::Refresh.is_write());
        assert!(Command::SetMode(0).is_write());
        assert_eq!(Command::SetPoint("minimum_reserve".into(), 10.0).key(), "minimum_reserve");
    }
}
