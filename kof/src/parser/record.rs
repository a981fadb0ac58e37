//! Classification des lignes par code d'enregistrement
//!
//! Le code est lu sur le premier token de la ligne. Les lignes `09` portent un
//! sous-type (`09 91`, `09_91`, `09.91`) normalisé avec `_`.

use crate::assemble::distribute::MultiLineMethod;

/// Code de contrôle d'une ligne `09_xx`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCode {
    /// `09_91`: début de ligne simple
    GroupStart,
    /// `09_99`: fin de ligne(s)
    EndLine,
    /// `09_96`: fermeture de la ligne en polygone
    ClosePolygon,
    /// `09_72`..`09_79` (scie) et `09_82`..`09_89` (vague)
    MultiLine { method: MultiLineMethod, lines: usize },
    /// `09_90`, `09_92`, `09_93`, `09_94`: reconnus, non interprétés
    Unsupported(u8),
    /// Sous-type absent ou inconnu
    Unknown(String),
}

impl ControlCode {
    /// Interprète le sous-type à deux chiffres
    pub fn from_subtype(subtype: &str) -> Self {
        let Ok(value) = subtype.parse::<u8>() else {
            return Self::Unknown(subtype.to_string());
        };
        if subtype.len() != 2 {
            return Self::Unknown(subtype.to_string());
        }

        match value {
            91 => Self::GroupStart,
            99 => Self::EndLine,
            96 => Self::ClosePolygon,
            72..=79 => Self::MultiLine {
                method: MultiLineMethod::Saw,
                lines: usize::from(value - 70),
            },
            82..=89 => Self::MultiLine {
                method: MultiLineMethod::Wave,
                lines: usize::from(value - 80),
            },
            90 | 92 | 93 | 94 => Self::Unsupported(value),
            _ => Self::Unknown(subtype.to_string()),
        }
    }

    /// Clé composite (`09_91`, `09_72`, ...)
    pub fn key(&self) -> String {
        match self {
            Self::GroupStart => "09_91".to_string(),
            Self::EndLine => "09_99".to_string(),
            Self::ClosePolygon => "09_96".to_string(),
            Self::MultiLine { method, lines } => {
                let base = match method {
                    MultiLineMethod::Saw => 70,
                    MultiLineMethod::Wave => 80,
                };
                format!("09_{}", base + lines)
            }
            Self::Unsupported(value) => format!("09_{value:02}"),
            Self::Unknown(subtype) if subtype.is_empty() => "09".to_string(),
            Self::Unknown(subtype) => format!("09_{subtype}"),
        }
    }
}

/// Code d'enregistrement d'une ligne KOF
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordCode {
    /// `00`: commentaire / texte libre
    Comment,
    /// `01`..`04`, `06`..`08`: en-têtes administratifs et stations, non interprétés
    Reserved(u8),
    /// `05`: observation de coordonnées
    Point,
    /// `09`: marqueur de groupe
    Control(ControlCode),
    /// `10`: métadonnées du fichier
    FileAttributes,
    /// `11`: attributs rattachés à la prochaine géométrie
    PendingAttributes,
    /// `12`: propriétés du fichier
    FileProperties,
    /// `20`: données de mesure (facteur d'échelle, constante)
    Measurement,
    /// `30`: attributs rattachés à la prochaine géométrie
    GeometryAttributes,
    /// `100`..`161`: codes d'attributs de point
    PointAttribute(u16),
    Unknown(String),
}

impl RecordCode {
    /// Classe une ligne déjà `trim()`ée, non vide, ne commençant pas par `-`
    pub fn classify(trimmed: &str) -> Self {
        let mut tokens = trimmed.split_whitespace();
        let Some(first) = tokens.next() else {
            return Self::Unknown(String::new());
        };

        if first.len() == 3 && first.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(value @ 100..=161) = first.parse::<u16>() {
                return Self::PointAttribute(value);
            }
        }

        let code: String = trimmed.chars().take(2).collect();
        match code.as_str() {
            "09" => {
                let rest = trimmed[2..].trim_start_matches(['_', '.', ' ', '\t']);
                let subtype: String = rest.chars().take_while(char::is_ascii_digit).collect();
                Self::Control(ControlCode::from_subtype(&subtype))
            }
            "91" | "96" | "99" if first.len() == 2 => Self::Control(ControlCode::from_subtype(&code)),
            "00" => Self::Comment,
            "01" | "02" | "03" | "04" | "06" | "07" | "08" => {
                Self::Reserved(code.parse().unwrap_or_default())
            }
            "05" => Self::Point,
            "10" => Self::FileAttributes,
            "11" => Self::PendingAttributes,
            "12" => Self::FileProperties,
            "20" => Self::Measurement,
            "30" => Self::GeometryAttributes,
            _ => Self::Unknown(code),
        }
    }

    /// Clé utilisée pour les compteurs de métadonnées
    pub fn key(&self) -> String {
        match self {
            Self::Comment => "00".to_string(),
            Self::Reserved(value) => format!("{value:02}"),
            Self::Point => "05".to_string(),
            Self::Control(control) => control.key(),
            Self::FileAttributes => "10".to_string(),
            Self::PendingAttributes => "11".to_string(),
            Self::FileProperties => "12".to_string(),
            Self::Measurement => "20".to_string(),
            Self::GeometryAttributes => "30".to_string(),
            Self::PointAttribute(value) => value.to_string(),
            Self::Unknown(code) => code.clone(),
        }
    }
}

/// Vrai si une ligne de début de groupe porte aussi un token de fin (`96`/`99`)
pub fn has_end_token(trimmed: &str) -> bool {
    let rest = match trimmed.strip_prefix("09") {
        Some(rest) => rest.trim_start_matches(['_', '.', ' ', '\t']),
        None => trimmed,
    };
    // Le premier token est le sous-type lui-même
    let after_subtype = rest.trim_start_matches(|c: char| c.is_ascii_digit());
    after_subtype
        .split(|c: char| c.is_whitespace() || c == '_' || c == '.')
        .any(|tok| tok == "96" || tok == "99")
}
