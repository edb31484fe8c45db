use super::ParseError;
use crate::shared::xml::parse_fragment;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastVerb {
    Shutdown,
    ReadConfig,
    Unknown(String),
}

impl BroadcastVerb {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("shutdown") {
            Self::Shutdown
        } else if trimmed.eq_ignore_ascii_case("readconfig") {
            Self::ReadConfig
        } else {
            Self::Unknown(trimmed.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastCommand {
    pub machines: Vec<String>,
    pub verb: BroadcastVerb,
}

impl BroadcastCommand {
    pub fn applies_to(&self, manager_name: &str) -> bool {
        self.machines.iter().any(|machine| machine == manager_name)
    }
}

pub fn parse_broadcast_xml(input: &str) -> Result<BroadcastCommand, ParseError> {
    let doc = parse_fragment(input).map_err(ParseError::Broadcast)?;

    let machines = doc
        .select_all(&["Managers"])
        .into_iter()
        .flat_map(|managers| managers.children.iter())
        .map(|machine| machine.inner_text())
        .filter(|name| !name.is_empty())
        .collect();

    let verb = BroadcastVerb::parse(&doc.descendant_text("Message").unwrap_or_default());

    Ok(BroadcastCommand { machines, verb })
}
