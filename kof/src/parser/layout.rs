//! Gabarit de colonnes dérivé de l'en-tête `-05`
//!
//! L'en-tête est analysé une seule fois en une table `champ -> (début, largeur)`,
//! puis chaque ligne `05` est découpée par simple tranche de caractères.

/// En-tête KOF standard
pub const DEFAULT_HEADER: &str = "-05 PPPPPPPPPP KKKKKKKK XXXXXXXX.XXX YYYYYYY.YYY ZZZZ.ZZZ";

/// Champ d'une ligne `05`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// P: nom du point
    Name,
    /// K: code objet
    Code,
    /// X: nord
    Northing,
    /// Y: est
    Easting,
    /// Z: altitude
    Elevation,
}

impl Field {
    /// Champ désigné par la première lettre d'un token d'en-tête
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'P' => Some(Self::Name),
            'K' => Some(Self::Code),
            'X' => Some(Self::Northing),
            'Y' => Some(Self::Easting),
            'Z' => Some(Self::Elevation),
            _ => None,
        }
    }
}

/// Position d'un champ (en caractères, 0-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpan {
    pub field: Field,
    pub start: usize,
    pub width: usize,
}

/// Valeurs brutes extraites d'une ligne (déjà `trim()`ées, `None` si vides)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnFields {
    pub name: Option<String>,
    pub code: Option<String>,
    pub northing: Option<String>,
    pub easting: Option<String>,
    pub elevation: Option<String>,
    /// Texte après le dernier champ
    pub trailing: Option<String>,
}

/// Gabarit de colonnes immuable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    spans: Vec<FieldSpan>,
    /// L'en-tête commence par `-`: les lignes de données sont décalées d'un caractère
    marker_prefixed: bool,
}

impl Default for ColumnLayout {
    /// Gabarit sans en-tête: nom 10, code 8, nord 13, est 13, altitude 8,
    /// après le préfixe `05 `
    fn default() -> Self {
        let widths = [
            (Field::Name, 10),
            (Field::Code, 8),
            (Field::Northing, 13),
            (Field::Easting, 13),
            (Field::Elevation, 8),
        ];
        let mut start = 3;
        let spans = widths
            .iter()
            .map(|&(field, width)| {
                let span = FieldSpan {
                    field,
                    start,
                    width,
                };
                start += width;
                span
            })
            .collect();

        Self {
            spans,
            marker_prefixed: false,
        }
    }
}

impl ColumnLayout {
    /// Analyse une ligne d'en-tête (`-05 PPPP KKKK XXXX YYYY ZZZZ`)
    ///
    /// Chaque token commençant par P, K, X, Y ou Z définit un champ qui
    /// s'étend jusqu'au début du token suivant. Retourne `None` si aucun
    /// champ n'est reconnu. Les colonnes sont comptées depuis le premier
    /// caractère non blanc, comme dans [`ColumnLayout::extract`].
    pub fn from_header(header: &str) -> Option<Self> {
        let header = header.trim();
        let chars: Vec<char> = header.chars().collect();

        // (début, longueur, première lettre)
        let mut tokens = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            if chars[i].is_whitespace() {
                i += 1;
                continue;
            }
            let start = i;
            while i < chars.len() && !chars[i].is_whitespace() {
                i += 1;
            }
            tokens.push((start, i - start, chars[start]));
        }

        let mut spans: Vec<FieldSpan> = Vec::new();
        for (k, &(start, len, letter)) in tokens.iter().enumerate() {
            let Some(field) = Field::from_letter(letter) else {
                continue;
            };
            if spans.iter().any(|s| s.field == field) {
                continue;
            }
            let width = match tokens.get(k + 1) {
                Some(&(next_start, _, _)) => next_start - start,
                None => len,
            };
            spans.push(FieldSpan {
                field,
                start,
                width,
            });
        }

        if spans.is_empty() {
            return None;
        }

        Some(Self {
            spans,
            marker_prefixed: header.starts_with('-'),
        })
    }

    pub fn spans(&self) -> &[FieldSpan] {
        &self.spans
    }

    pub fn span(&self, field: Field) -> Option<&FieldSpan> {
        self.spans.iter().find(|s| s.field == field)
    }

    /// Champs dans l'ordre des colonnes
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.spans.iter().map(|s| s.field)
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Découpe une ligne de données selon le gabarit
    ///
    /// L'indentation de la ligne est ignorée.
    pub fn extract(&self, row: &str) -> ColumnFields {
        let row = row.trim_end_matches(['\r', '\n']).trim_start();
        let chars: Vec<char> = row.chars().collect();
        let shift = usize::from(self.marker_prefixed && !row.starts_with('-'));

        let mut fields = ColumnFields::default();
        let mut max_end = 0;
        for span in &self.spans {
            let start = span.start.saturating_sub(shift);
            let end = start + span.width;
            max_end = max_end.max(end);

            let value = slice_trimmed(&chars, start, end);
            match span.field {
                Field::Name => fields.name = value,
                Field::Code => fields.code = value,
                Field::Northing => fields.northing = value,
                Field::Easting => fields.easting = value,
                Field::Elevation => fields.elevation = value,
            }
        }
        fields.trailing = slice_trimmed(&chars, max_end, chars.len());

        fields
    }
}

fn slice_trimmed(chars: &[char], start: usize, end: usize) -> Option<String> {
    let end = end.min(chars.len());
    if start >= end {
        return None;
    }
    let value: String = chars[start..end].iter().collect();
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
