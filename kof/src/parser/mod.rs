//! Parsing ligne à ligne d'un contenu KOF

pub mod attributes;
pub mod layout;
pub mod record;
pub mod row;

use tracing::{debug, trace, warn};

use crate::assemble::GroupAssembler;
use crate::config::{ParseMode, ParseOptions};
use crate::error::{Warning, WarningKind};
use crate::metadata::{FileMetadata, Measurement, ParserMode};
use crate::types::{Diagnostic, ParseResult};

use self::attributes::parse_attributes;
use self::layout::ColumnLayout;
use self::record::{has_end_token, ControlCode, RecordCode};
use self::row::decode_point;

/// Parse un contenu KOF déjà décodé
///
/// Ne retourne jamais d'erreur: les lignes invalides produisent des
/// avertissements et le parsing continue.
pub fn parse(content: &str, options: &ParseOptions) -> ParseResult {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let lines: Vec<&str> = content.lines().collect();

    let layout = resolve_layout(&lines, options);
    let mut result = ParseResult {
        metadata: FileMetadata::scan(&lines),
        ..ParseResult::default()
    };
    result.metadata.mode = if layout.is_some() {
        ParserMode::Columns
    } else {
        ParserMode::Tokens
    };

    let mut assembler = GroupAssembler::new();
    let mut warnings = Vec::new();
    // Plage courante de lignes commençant par '-'
    let mut ignored: Option<(usize, usize)> = None;

    for (idx, raw) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw.trim();

        if trimmed.starts_with('-') {
            ignored = match ignored {
                Some((first, last)) if last + 1 == line_no => Some((first, line_no)),
                Some(range) => {
                    warnings.push(ignored_warning(range));
                    Some((line_no, line_no))
                }
                None => Some((line_no, line_no)),
            };
            continue;
        }
        if let Some(range) = ignored.take() {
            warnings.push(ignored_warning(range));
        }
        if trimmed.is_empty() {
            continue;
        }

        match RecordCode::classify(trimmed) {
            RecordCode::Point => match decode_point(raw, idx, layout.as_ref()) {
                Ok(row) => {
                    trace!(line = line_no, strategy = %row.strategy, "Row decoded");
                    result.diagnostics.push(Diagnostic {
                        line: line_no,
                        strategy: row.strategy.clone(),
                    });
                    let point = row.into_point(raw);
                    if let Some(code) = point.resolved_code() {
                        result.metadata.feature_codes.insert(code.to_string());
                    }
                    assembler.push_point(point, line_no);
                }
                Err(err) => {
                    warn!(line = line_no, error = %err, "Malformed row skipped");
                    warnings.push(Warning::from(err));
                }
            },
            RecordCode::Control(control) => {
                let conflicting = control == ControlCode::GroupStart && has_end_token(trimmed);
                assembler.control(&control, conflicting, line_no);
            }
            RecordCode::PendingAttributes | RecordCode::GeometryAttributes => {
                assembler.set_pending_attributes(parse_attributes(trimmed));
            }
            RecordCode::FileAttributes | RecordCode::FileProperties => {
                result.metadata.attributes.extend(parse_attributes(trimmed));
            }
            RecordCode::Measurement => {
                let attributes = parse_attributes(trimmed);
                debug!(line = line_no, ?attributes, "Measurement record");
                result.metadata.measurements.push(Measurement {
                    line: line_no,
                    attributes,
                });
            }
            RecordCode::Comment => {
                let text = trimmed.strip_prefix("00").unwrap_or(trimmed).trim();
                result.metadata.comments.push(text.to_string());
            }
            RecordCode::Reserved(_) | RecordCode::PointAttribute(_) => {
                trace!(line = line_no, "Record recognized, not interpreted");
            }
            RecordCode::Unknown(code) => {
                warnings.push(Warning::new(
                    line_no,
                    WarningKind::UnknownCode,
                    format!("KOF line {line_no} has unknown code '{code}'."),
                ));
            }
        }
    }
    if let Some(range) = ignored {
        warnings.push(ignored_warning(range));
    }

    let (geometries, group_warnings) = assembler.finish();
    for geometry in geometries {
        result.push_geometry(geometry);
    }

    warnings.extend(group_warnings);
    // Tri stable: l'ordre d'émission est conservé pour une même ligne
    warnings.sort_by_key(|w| w.line);
    result.warnings = warnings;

    result
}

/// Gabarit de colonnes: en-tête imposé, puis en-tête du fichier, puis gabarit
/// par défaut si le mode colonnes est demandé
fn resolve_layout(lines: &[&str], options: &ParseOptions) -> Option<ColumnLayout> {
    if let Some(layout) = options.header.as_deref().and_then(ColumnLayout::from_header) {
        return Some(layout);
    }

    let sniffed = lines
        .iter()
        .map(|l| l.trim_start())
        .find(|l| l.starts_with("-05"));
    if let Some(header) = sniffed {
        match ColumnLayout::from_header(header) {
            Some(layout) => return Some(layout),
            None => debug!(header, "Header without P/K/X/Y/Z fields"),
        }
    }

    match options.mode {
        ParseMode::Columns => Some(ColumnLayout::default()),
        ParseMode::Auto => None,
    }
}

fn ignored_warning((first, last): (usize, usize)) -> Warning {
    let message = if first == last {
        format!("KOF line {first} ignored (start with '-')")
    } else {
        format!("KOF lines {first} to {last} ignored (start with '-')")
    };
    Warning::new(first, WarningKind::IgnoredLines, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KofGeometry;

    fn parse_default(content: &str) -> ParseResult {
        parse(content, &ParseOptions::default())
    }

    #[test]
    fn test_mode_selection() {
        let with_header = "-05 PPPPPPPPPP KKKKKKKK XXXXXXXX.XXX YYYYYYY.YYY ZZZZ.ZZZ\n\
                           05 P1 1001 6540000.000 314000.000 10.500\n";
        let result = parse_default(with_header);
        assert_eq!(result.metadata.mode, ParserMode::Columns);
        assert!(result.diagnostics[0].strategy.starts_with("columns"));

        let without = "05 P1 1001 6540000.000 314000.000 10.500\n";
        let result = parse_default(without);
        assert_eq!(result.metadata.mode, ParserMode::Tokens);
        assert_eq!(result.diagnostics[0].strategy, "tokens-end-3");
    }

    #[test]
    fn test_header_after_bom() {
        let content = "\u{feff}-05 PPPPPPPPPP KKKKKKKK XXXXXXXX.XXX YYYYYYY.YYY ZZZZ.ZZZ\n";
        let result = parse_default(content);
        assert_eq!(result.metadata.mode, ParserMode::Columns);
    }

    #[test]
    fn test_ignored_lines_coalesced() {
        let content = "- a\n- b\n  -c\n05 P1 1001 6540000.000 314000.000\n-d\n";
        let result = parse_default(content);
        let ignored: Vec<&Warning> = result
            .warnings
            .iter()
            .filter(|w| w.kind == WarningKind::IgnoredLines)
            .collect();
        assert_eq!(ignored.len(), 2);
        assert_eq!(ignored[0].message, "KOF lines 1 to 3 ignored (start with '-')");
        assert_eq!(ignored[1].message, "KOF line 5 ignored (start with '-')");
    }

    #[test]
    fn test_unknown_code_warning() {
        let result = parse_default("42 something\n");
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, WarningKind::UnknownCode);
        assert_eq!(result.warnings[0].message, "KOF line 1 has unknown code '42'.");
    }

    #[test]
    fn test_file_level_records() {
        let content = "00 Oppmåling 2024\n10 job=\"Kum 12\" operator=AB\n12 units=m\n20 scale=1.0002\n";
        let result = parse_default(content);
        let meta = &result.metadata;
        assert_eq!(meta.comments, vec!["Oppmåling 2024".to_string()]);
        assert_eq!(
            meta.attributes.get("job").and_then(|v| v.as_str()),
            Some("Kum 12")
        );
        assert!(meta.attributes.contains_key("units"));
        assert_eq!(meta.measurements.len(), 1);
        assert_eq!(meta.measurements[0].line, 4);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_pending_attributes_attach_to_next_geometry() {
        let content = "11 owner=NVE\n\
                       09 91\n\
                       05 A 8001 6540000.000 314000.000\n\
                       05 B 8001 6540010.000 314010.000\n\
                       09 99\n\
                       05 C 8002 6540020.000 314020.000\n";
        let result = parse_default(content);
        assert_eq!(result.geometries.len(), 2);
        assert_eq!(
            result.geometries[0]
                .attributes()
                .get("owner")
                .and_then(|v| v.as_str()),
            Some("NVE")
        );
        assert!(result.geometries[1].attributes().is_empty());
    }

    #[test]
    fn test_conflicting_marker_line() {
        let content = "09 91 99\n05 A 8001 6540000.000 314000.000\n";
        let result = parse_default(content);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, WarningKind::ConflictingMarker);
        assert!(matches!(result.geometries[0], KofGeometry::Point(_)));
    }

    #[test]
    fn test_feature_codes_and_counts() {
        let content = "05 A 8001 6540000.000 314000.000\n\
                       05 B 8002 6540010.000 314010.000\n\
                       05 C 8001 6540020.000 314020.000\n";
        let result = parse_default(content);
        let codes: Vec<&str> = result
            .metadata
            .feature_codes
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(codes, vec!["8001", "8002"]);
        assert_eq!(result.metadata.geometry_counts.points, 3);
        assert_eq!(result.metadata.record_count("05"), 3);
    }

    #[test]
    fn test_columns_mode_requested_without_header() {
        let row = format!(
            "05 {:<10}{:<8}{:>13}{:>13}{:>8}",
            "P1", "1001", "6540000.000", "314000.000", "10.500"
        );
        let options = ParseOptions::default().with_mode(ParseMode::Columns);
        let result = parse(&row, &options);
        assert_eq!(result.metadata.mode, ParserMode::Columns);
        assert_eq!(result.diagnostics[0].strategy, "columns");
        let point = result.points().next().unwrap();
        assert_eq!(point.name.as_deref(), Some("P1"));
        assert_eq!(point.elevation, Some(10.5));
    }

    #[test]
    fn test_warnings_sorted_by_line() {
        let content = "09 91\n05 BAD x y\n05 A 8001 6540000.000 314000.000\n42 x\n";
        let result = parse_default(content);
        let lines: Vec<usize> = result.warnings.iter().map(|w| w.line).collect();
        let mut sorted = lines.clone();
        sorted.sort();
        assert_eq!(lines, sorted);
        // Groupe non fermé (ligne 1), ligne mal formée (2), groupe < 2 points (1), code inconnu (4)
        assert_eq!(result.warnings.len(), 4);
    }

    #[test]
    fn test_indented_columns_file() {
        let content = "  -05 PPPPPPPPPP KKKKKKKK XXXXXXXX.XXX YYYYYYY.YYY ZZZZ.ZZZ\n\
                       \x20 05 KUM 1      8001     6621154.208  570210.455  12.330\n";
        let result = parse_default(content);
        assert_eq!(result.metadata.mode, ParserMode::Columns);
        assert_eq!(result.diagnostics[0].strategy, "columns");
        let point = result.points().next().unwrap();
        assert_eq!(point.name.as_deref(), Some("KUM 1"));
        assert_eq!(point.code.as_deref(), Some("8001"));
        assert_eq!(point.northing, 6621154.208);
        assert_eq!(point.elevation, Some(12.33));
    }

    #[test]
    fn test_header_option_overrides_file_header() {
        // Ordre K, P, Y, X, Z avec d'autres largeurs que l'en-tête du fichier
        let options =
            ParseOptions::default().with_header("-05 KKKK PPPPPP YYYYYYYYYY XXXXXXXXXXX ZZZZZZ");
        let content = format!(
            "{}\n05 8001 KUM-1  570210.455 6621154.208 12.330\n",
            layout::DEFAULT_HEADER
        );
        let result = parse(&content, &options);

        assert_eq!(result.metadata.mode, ParserMode::Columns);
        assert_eq!(result.diagnostics[0].strategy, "columns");
        let point = result.points().next().unwrap();
        assert_eq!(point.name.as_deref(), Some("KUM-1"));
        assert_eq!(point.code.as_deref(), Some("8001"));
        assert_eq!(point.northing, 6621154.208);
        assert_eq!(point.easting, 570210.455);
        assert_eq!(point.elevation, Some(12.33));
    }
}
