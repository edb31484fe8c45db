use super::ParseError;
use crate::shared::xml::{parse_fragment, XmlElement};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamsV0 {
    pub package: String,
    pub local: String,
    pub share: String,
    pub year: String,
    pub team: String,
    pub directory: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamsV1 {
    pub package: String,
    pub path_local_root: String,
    pub path_shared_root: String,
    pub path_directory: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandParams {
    V0(ParamsV0),
    V1(ParamsV1),
}

impl CommandParams {
    pub fn version(&self) -> u8 {
        match self {
            Self::V0(_) => 0,
            Self::V1(_) => 1,
        }
    }

    pub fn package(&self) -> &str {
        match self {
            Self::V0(params) => &params.package,
            Self::V1(params) => &params.package,
        }
    }

    pub fn local_root(&self) -> &str {
        match self {
            Self::V0(params) => &params.local,
            Self::V1(params) => &params.path_local_root,
        }
    }

    pub fn shared_root(&self) -> &str {
        match self {
            Self::V0(params) => &params.share,
            Self::V1(params) => &params.path_shared_root,
        }
    }

    pub fn segments(&self) -> Vec<String> {
        match self {
            Self::V0(params) => vec![
                params.team.clone(),
                params.year.clone(),
                params.directory.clone(),
            ],
            Self::V1(params) => params
                .path_directory
                .split('\\')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn to_map(&self) -> ParamMap {
        let mut map = ParamMap::default();
        map.insert("package", self.package());
        match self {
            Self::V0(params) => {
                map.insert("local", &params.local);
                map.insert("share", &params.share);
                map.insert("year", &params.year);
                map.insert("team", &params.team);
                map.insert("directory", &params.directory);
            }
            Self::V1(params) => {
                map.insert("Path_Local_Root", &params.path_local_root);
                map.insert("Path_Shared_Root", &params.path_shared_root);
                map.insert("Path_Directory", &params.path_directory);
            }
        }
        map
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamMap {
    entries: Vec<(String, String)>,
}

impl ParamMap {
    pub fn insert(&mut self, key: &str, value: &str) {
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(key))
        {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

pub fn parse_command_xml(input: &str) -> Result<CommandParams, ParseError> {
    let doc = parse_fragment(input).map_err(ParseError::Malformed)?;
    let package = text_of(&doc, "package");

    if doc.descendant("Path_Local_Root").is_some() {
        return Ok(CommandParams::V1(ParamsV1 {
            package,
            path_local_root: text_of(&doc, "Path_Local_Root"),
            path_shared_root: text_of(&doc, "Path_Shared_Root"),
            path_directory: text_of(&doc, "Path_Folder"),
        }));
    }

    if doc.descendant("local").is_some() {
        return Ok(CommandParams::V0(ParamsV0 {
            package,
            local: text_of(&doc, "local"),
            share: text_of(&doc, "share"),
            year: text_of(&doc, "year"),
            team: text_of(&doc, "team"),
            directory: text_of(&doc, "folder"),
        }));
    }

    Err(ParseError::UnrecognizedFormat)
}

fn text_of(doc: &XmlElement, name: &str) -> String {
    doc.descendant_text(name).unwrap_or_default()
}
