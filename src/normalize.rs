use serde::{Deserialize, Serialize};

pub fn normalize_text(input: &str) -> String {
    let mut folded = String::with_capacity(input.len());
    for ch in input.trim().chars() {
        if ch.is_ascii() {
            folded.push(ch.to_ascii_lowercase());
        } else if let Some(base) = fold_accent(ch) {
            folded.push(base);
        } else if ch.is_whitespace() {
            folded.push(' ');
        }
    }
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn team_key(input: &str) -> String {
    normalize_text(input).replace(' ', "-")
}

pub fn player_key(input: &str) -> String {
    normalize_text(input)
}

pub fn match_key(input: &str) -> String {
    input.trim().to_lowercase()
}

fn fold_accent(ch: char) -> Option<char> {
    let base = match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'a',
        'ç' | 'Ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => 'i',
        'ñ' | 'Ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => 'o',
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => 'u',
        'ý' | 'ÿ' | 'Ý' => 'y',
        _ => return None,
    };
    Some(base)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionGroup {
    Gk,
    Def,
    Mid,
    For,
    Unk,
}

impl PositionGroup {
    pub const ALL: [PositionGroup; 5] = [
        PositionGroup::Gk,
        PositionGroup::Def,
        PositionGroup::Mid,
        PositionGroup::For,
        PositionGroup::Unk,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PositionGroup::Gk => "gk",
            PositionGroup::Def => "def",
            PositionGroup::Mid => "mid",
            PositionGroup::For => "for",
            PositionGroup::Unk => "unk",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "gk" => Some(PositionGroup::Gk),
            "def" => Some(PositionGroup::Def),
            "mid" => Some(PositionGroup::Mid),
            "for" => Some(PositionGroup::For),
            "unk" => Some(PositionGroup::Unk),
            _ => None,
        }
    }
}

/// Maps a scraped position ("CB", "cdm/cb", "Forward") to its raw zone and
/// broad group. Only the first slash-separated token counts.
pub fn normalize_position(raw: &str) -> (String, PositionGroup) {
    let letters: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || *c == '/')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if letters.is_empty() {
        return ("UNK".to_string(), PositionGroup::Unk);
    }
    let zone = letters.split('/').next().unwrap_or("").to_string();

    if let Some(group) = exact_position(&zone) {
        return (zone, group);
    }

    // Substring fallback; order matters since "D" also occurs in "MID".
    const GK: &[&str] = &["GK", "GOAL"];
    const DEF: &[&str] = &["CB", "D", "LB", "RB", "DEF", "FB", "WB", "BACK", "CD"];
    const MID: &[&str] = &["CM", "M", "CDM", "LMF", "RMF", "MF", "MID", "CAM", "AMF"];
    const FOR: &[&str] = &["ST", "F", "CF", "FW", "W"];

    let hit = |needles: &[&str]| needles.iter().any(|n| zone.contains(n));
    let group = if hit(GK) {
        PositionGroup::Gk
    } else if hit(DEF) {
        PositionGroup::Def
    } else if hit(MID) {
        PositionGroup::Mid
    } else if hit(FOR) {
        PositionGroup::For
    } else {
        PositionGroup::Unk
    };
    (zone, group)
}

fn exact_position(zone: &str) -> Option<PositionGroup> {
    let group = match zone {
        "G" | "GK" | "GOALKEEPER" | "KEEPER" => PositionGroup::Gk,
        "D" | "DF" | "DEF" | "DEFENDER" | "CB" | "LB" | "RB" | "FB" | "WB" | "LWB" | "RWB" => {
            PositionGroup::Def
        }
        "M" | "MF" | "MID" | "MIDFIELDER" | "CM" | "CDM" | "DM" | "CAM" | "AM" | "LM" | "RM" => {
            PositionGroup::Mid
        }
        "F" | "FW" | "FWD" | "FORWARD" | "ST" | "STRIKER" | "CF" | "LW" | "RW" | "W" => {
            PositionGroup::For
        }
        _ => return None,
    };
    Some(group)
}

pub fn normalize_year(raw: &str) -> (u8, &'static str) {
    let cleaned = raw.trim().to_lowercase().replace('.', "");
    let std = match cleaned.as_str() {
        "fr" | "frosh" | "freshman" | "1" | "1st" | "first" => "1st",
        "so" | "sophomore" | "2" | "2nd" | "second" => "2nd",
        "jr" | "junior" | "3" | "3rd" | "third" => "3rd",
        "sr" | "senior" | "4" | "4th" | "fourth" => "4th",
        "5" | "5th" | "fifth" => "5th",
        _ => "UNK",
    };
    let num = match std {
        "1st" => 1,
        "2nd" => 2,
        "3rd" => 3,
        "4th" => 4,
        "5th" => 5,
        _ => 0,
    };
    (num, std)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_folds_and_collapses() {
        assert_eq!(normalize_text("  José   Martínez "), "jose martinez");
        assert_eq!(normalize_text("UBC\tOkanagan"), "ubc okanagan");
    }

    #[test]
    fn team_key_dashes_spaces() {
        assert_eq!(team_key(" Trinity Western "), "trinity-western");
        assert_eq!(team_key("trinity-western"), "trinity-western");
    }

    #[test]
    fn position_groups_follow_precedence() {
        assert_eq!(normalize_position("GK").1, PositionGroup::Gk);
        assert_eq!(normalize_position("cdm/cb"), ("CDM".to_string(), PositionGroup::Mid));
        assert_eq!(normalize_position("MF").1, PositionGroup::Mid);
        assert_eq!(normalize_position("Midfielder").1, PositionGroup::Mid);
        assert_eq!(normalize_position("Forward").1, PositionGroup::For);
        assert_eq!(normalize_position("RCB").1, PositionGroup::Def);
        assert_eq!(normalize_position("ST").1, PositionGroup::For);
        assert_eq!(normalize_position("").1, PositionGroup::Unk);
        assert_eq!(normalize_position("xyz").1, PositionGroup::Unk);
    }

    #[test]
    fn year_accepts_text_and_ordinals() {
        assert_eq!(normalize_year("Fr."), (1, "1st"));
        assert_eq!(normalize_year("Senior"), (4, "4th"));
        assert_eq!(normalize_year("5"), (5, "5th"));
        assert_eq!(normalize_year("RS-So"), (0, "UNK"));
        assert_eq!(normalize_year(""), (0, "UNK"));
    }
}
