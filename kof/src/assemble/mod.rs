//! Construction des géométries à partir des codes de contrôle `09`
//!
//! Machine à deux états:
//! - `Idle`: chaque point `05` devient un point isolé
//! - `Open`: les points s'accumulent dans le groupe courant jusqu'à `09_99`
//!   (ligne), `09_96` (polygone), un nouveau `09_91` ou la fin du fichier

pub mod distribute;

use tracing::debug;

use crate::error::{Warning, WarningKind};
use crate::parser::record::ControlCode;
use crate::types::{Attributes, KofGeometry, KofLine, KofPoint, KofPolygon};

use self::distribute::{Distributor, MultiLineMethod};

/// État de l'assembleur
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    Idle,
    Open,
}

/// Type de géométrie résolu à la fermeture d'un groupe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupKind {
    Line,
    Polygon,
}

/// Groupe en cours
#[derive(Debug)]
struct Group {
    /// Ligne d'ouverture (1-based)
    start_line: usize,
    points: Vec<KofPoint>,
    distributor: Option<Distributor<KofPoint>>,
}

impl Group {
    fn new(start_line: usize) -> Self {
        Self {
            start_line,
            points: Vec::new(),
            distributor: None,
        }
    }

    fn push(&mut self, point: KofPoint) {
        match &mut self.distributor {
            Some(distributor) => distributor.push(point),
            None => self.points.push(point),
        }
    }

    /// Passe en mode multi-lignes: les points déjà lus sont répartis d'abord
    fn start_multi_line(&mut self, method: MultiLineMethod, lines: usize) {
        let mut distributor = Distributor::new(method, lines);
        distributor.extend(self.points.drain(..));
        self.distributor = Some(distributor);
    }
}

/// Assembleur de groupes
///
/// Les géométries sont émises dans l'ordre de fermeture des groupes.
#[derive(Debug, Default)]
pub struct GroupAssembler {
    group: Option<Group>,
    /// Attributs `11` / `30` en attente de la prochaine géométrie
    pending: Attributes,
    output: Vec<KofGeometry>,
    warnings: Vec<Warning>,
}

impl GroupAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AssemblerState {
        if self.group.is_some() {
            AssemblerState::Open
        } else {
            AssemblerState::Idle
        }
    }

    /// Remplace les attributs en attente
    pub fn set_pending_attributes(&mut self, attributes: Attributes) {
        self.pending = attributes;
    }

    /// Point `05` décodé (`line` 1-based)
    pub fn push_point(&mut self, mut point: KofPoint, line: usize) {
        if !point.is_valid() {
            debug!(line, "Point at (0, 0) dropped");
            return;
        }

        match &mut self.group {
            Some(group) => group.push(point),
            None => {
                // Les attributs de la ligne priment sur ceux en attente
                let mut attributes = std::mem::take(&mut self.pending);
                attributes.append(&mut point.attributes);
                point.attributes = attributes;
                self.output.push(KofGeometry::Point(point));
            }
        }
    }

    /// Code de contrôle `09_xx` (`conflicting`: ligne `91` portant aussi `96`/`99`)
    pub fn control(&mut self, control: &ControlCode, conflicting: bool, line: usize) {
        match control {
            ControlCode::GroupStart => {
                if self.group.is_some() {
                    self.flush(GroupKind::Line);
                }
                if conflicting {
                    self.warn(
                        line,
                        WarningKind::ConflictingMarker,
                        format!("KOF line {line} has both 91 and 99/96, skipping group."),
                    );
                } else {
                    self.group = Some(Group::new(line));
                }
            }
            ControlCode::EndLine => {
                if self.group.is_some() {
                    self.flush(GroupKind::Line);
                } else {
                    self.warn(
                        line,
                        WarningKind::OrphanControlMarker,
                        format!("KOF line {line} has 99 but no open group."),
                    );
                }
            }
            ControlCode::ClosePolygon => {
                if self.group.is_some() {
                    self.flush(GroupKind::Polygon);
                } else {
                    self.warn(
                        line,
                        WarningKind::OrphanControlMarker,
                        format!("KOF line {line} has 96 but no open group."),
                    );
                }
            }
            ControlCode::MultiLine { method, lines } => {
                // Un second code multi-lignes redémarre le groupe
                if self
                    .group
                    .as_ref()
                    .is_some_and(|g| g.distributor.is_some())
                {
                    self.flush(GroupKind::Line);
                }
                let group = self.group.get_or_insert_with(|| Group::new(line));
                group.start_multi_line(*method, *lines);
                debug!(line, method = method.as_str(), lines, "Multi-line mode");
            }
            ControlCode::Unsupported(value) => {
                self.warn(
                    line,
                    WarningKind::UnsupportedControl,
                    format!("KOF line {line} has unsupported control code 09_{value:02}, ignored."),
                );
            }
            ControlCode::Unknown(_) => {
                self.warn(
                    line,
                    WarningKind::UnknownCode,
                    format!("KOF line {line} has unknown control code '{}'.", control.key()),
                );
            }
        }
    }

    /// Fin de fichier: un groupe encore ouvert est émis comme ligne
    pub fn finish(mut self) -> (Vec<KofGeometry>, Vec<Warning>) {
        if let Some(start_line) = self.group.as_ref().map(|g| g.start_line) {
            self.warn(
                start_line,
                WarningKind::UnclosedGroup,
                format!("Group opened at line {start_line} was not closed before end of file."),
            );
            self.flush(GroupKind::Line);
        }
        (self.output, self.warnings)
    }

    fn flush(&mut self, kind: GroupKind) {
        let Some(group) = self.group.take() else {
            return;
        };
        let attributes = std::mem::take(&mut self.pending);
        let start = group.start_line;

        match group.distributor {
            Some(distributor) => self.flush_multi_line(kind, distributor, attributes, start),
            None => self.flush_single(kind, group.points, attributes, start),
        }
    }

    fn flush_single(
        &mut self,
        kind: GroupKind,
        points: Vec<KofPoint>,
        attributes: Attributes,
        start: usize,
    ) {
        match kind {
            GroupKind::Line if points.len() >= 2 => {
                debug!(line = start, points = points.len(), "Line group flushed");
                self.output
                    .push(KofGeometry::Line(KofLine::with_attributes(points, attributes)));
            }
            GroupKind::Line => self.warn(
                start,
                WarningKind::DegenerateGroup,
                format!("Line group at line {start} has less than 2 points, ignored."),
            ),
            GroupKind::Polygon if points.len() >= 3 => {
                let polygon = KofPolygon::new(points, attributes);
                if polygon.has_valid_ring() {
                    debug!(line = start, points = polygon.ring().len(), "Polygon group flushed");
                    self.output.push(KofGeometry::Polygon(polygon));
                } else {
                    self.warn(
                        start,
                        WarningKind::DegenerateGroup,
                        format!(
                            "Polygon group at line {start} has less than 3 distinct points, ignored."
                        ),
                    );
                }
            }
            GroupKind::Polygon => self.warn(
                start,
                WarningKind::DegenerateGroup,
                format!("Polygon group at line {start} has less than 3 points, ignored."),
            ),
        }
    }

    fn flush_multi_line(
        &mut self,
        kind: GroupKind,
        distributor: Distributor<KofPoint>,
        attributes: Attributes,
        start: usize,
    ) {
        debug!(
            line = start,
            method = distributor.method().as_str(),
            lines = distributor.lines(),
            points = distributor.len(),
            "Multi-line group flushed"
        );
        let buckets = distributor.into_buckets();

        match kind {
            GroupKind::Line => {
                for (segment, bucket) in buckets.into_iter().enumerate() {
                    if bucket.len() >= 2 {
                        self.output.push(KofGeometry::Line(KofLine::with_attributes(
                            bucket,
                            attributes.clone(),
                        )));
                    } else if bucket.is_empty() {
                        self.warn(
                            start,
                            WarningKind::DegenerateGroup,
                            format!(
                                "Multi-line segment {segment} in group at line {start} has no points, ignored."
                            ),
                        );
                    } else {
                        self.warn(
                            start,
                            WarningKind::DegenerateGroup,
                            format!(
                                "Multi-line segment {segment} in group at line {start} has less than 2 points, ignored."
                            ),
                        );
                    }
                }
            }
            GroupKind::Polygon => {
                let polygon = buckets
                    .into_iter()
                    .filter(|b| b.len() >= 3)
                    .map(|b| KofPolygon::new(b, attributes.clone()))
                    .find(KofPolygon::has_valid_ring);
                match polygon {
                    Some(polygon) => self.output.push(KofGeometry::Polygon(polygon)),
                    None => self.warn(
                        start,
                        WarningKind::DegenerateGroup,
                        format!(
                            "Polygon group at line {start} has no sufficiently large multi-line ring, ignored."
                        ),
                    ),
                }
            }
        }
    }

    fn warn(&mut self, line: usize, kind: WarningKind, message: String) {
        debug!(line, ?kind, "{message}");
        self.warnings.push(Warning::new(line, kind, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttrValue;

    fn pt(e: f64, n: f64) -> KofPoint {
        KofPoint::new(e, n)
    }

    fn start() -> ControlCode {
        ControlCode::GroupStart
    }

    #[test]
    fn test_idle_points_are_standalone() {
        let mut asm = GroupAssembler::new();
        asm.push_point(pt(1.0, 1.0), 1);
        asm.push_point(pt(2.0, 2.0), 2);
        assert_eq!(asm.state(), AssemblerState::Idle);
        let (geoms, warnings) = asm.finish();
        assert_eq!(geoms.len(), 2);
        assert!(geoms.iter().all(|g| matches!(g, KofGeometry::Point(_))));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_zero_point_dropped() {
        let mut asm = GroupAssembler::new();
        asm.push_point(pt(0.0, 0.0), 1);
        let (geoms, warnings) = asm.finish();
        assert!(geoms.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_line_group() {
        let mut asm = GroupAssembler::new();
        asm.control(&start(), false, 1);
        assert_eq!(asm.state(), AssemblerState::Open);
        asm.push_point(pt(1.0, 1.0), 2);
        asm.push_point(pt(2.0, 2.0), 3);
        asm.control(&ControlCode::EndLine, false, 4);
        assert_eq!(asm.state(), AssemblerState::Idle);

        let (geoms, _) = asm.finish();
        assert_eq!(geoms.len(), 1);
        assert_eq!(geoms[0].points().len(), 2);
        assert_eq!(geoms[0].type_name(), "LineString");
    }

    #[test]
    fn test_polygon_group_closed() {
        let mut asm = GroupAssembler::new();
        asm.control(&start(), false, 1);
        for (i, (e, n)) in [(0.0, 1.0), (1.0, 1.0), (1.0, 2.0), (0.0, 2.0)]
            .into_iter()
            .enumerate()
        {
            asm.push_point(pt(e, n), i + 2);
        }
        asm.control(&ControlCode::ClosePolygon, false, 6);

        let (geoms, warnings) = asm.finish();
        assert!(warnings.is_empty());
        let KofGeometry::Polygon(poly) = &geoms[0] else {
            panic!("expected polygon");
        };
        assert_eq!(poly.ring().len(), 5);
    }

    #[test]
    fn test_degenerate_groups() {
        let mut asm = GroupAssembler::new();
        asm.control(&start(), false, 1);
        asm.push_point(pt(1.0, 1.0), 2);
        asm.control(&ControlCode::EndLine, false, 3);
        asm.control(&start(), false, 4);
        asm.push_point(pt(1.0, 1.0), 5);
        asm.push_point(pt(2.0, 1.0), 6);
        asm.control(&ControlCode::ClosePolygon, false, 7);

        let (geoms, warnings) = asm.finish();
        assert!(geoms.is_empty());
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].line, 1);
        assert_eq!(warnings[0].kind, WarningKind::DegenerateGroup);
        assert!(warnings[1].message.contains("less than 3 points"));
    }

    #[test]
    fn test_orphan_markers() {
        let mut asm = GroupAssembler::new();
        asm.control(&ControlCode::EndLine, false, 3);
        asm.control(&ControlCode::ClosePolygon, false, 4);
        let (_, warnings) = asm.finish();
        assert_eq!(warnings.len(), 2);
        assert!(warnings
            .iter()
            .all(|w| w.kind == WarningKind::OrphanControlMarker));
        assert_eq!(warnings[0].message, "KOF line 3 has 99 but no open group.");
    }

    #[test]
    fn test_second_start_is_hard_start() {
        let mut asm = GroupAssembler::new();
        asm.control(&start(), false, 1);
        asm.push_point(pt(1.0, 1.0), 2);
        asm.push_point(pt(2.0, 2.0), 3);
        asm.control(&start(), false, 4);
        asm.push_point(pt(3.0, 3.0), 5);
        asm.push_point(pt(4.0, 4.0), 6);
        asm.control(&ControlCode::EndLine, false, 7);

        let (geoms, warnings) = asm.finish();
        assert!(warnings.is_empty());
        assert_eq!(geoms.len(), 2);
        assert_eq!(geoms[0].points()[0].easting, 1.0);
        assert_eq!(geoms[1].points()[0].easting, 3.0);
    }

    #[test]
    fn test_conflicting_start_discards_group() {
        let mut asm = GroupAssembler::new();
        asm.control(&start(), true, 1);
        assert_eq!(asm.state(), AssemblerState::Idle);
        asm.push_point(pt(1.0, 1.0), 2);

        let (geoms, warnings) = asm.finish();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::ConflictingMarker);
        // Le point suivant reste isolé
        assert!(matches!(geoms[0], KofGeometry::Point(_)));
    }

    #[test]
    fn test_unclosed_group_flushed_as_line() {
        let mut asm = GroupAssembler::new();
        asm.control(&start(), false, 2);
        asm.push_point(pt(1.0, 1.0), 3);
        asm.push_point(pt(2.0, 2.0), 4);

        let (geoms, warnings) = asm.finish();
        assert_eq!(geoms.len(), 1);
        assert_eq!(geoms[0].type_name(), "LineString");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::UnclosedGroup);
        assert_eq!(warnings[0].line, 2);
    }

    #[test]
    fn test_saw_multi_line() {
        let mut asm = GroupAssembler::new();
        asm.control(
            &ControlCode::MultiLine {
                method: MultiLineMethod::Saw,
                lines: 2,
            },
            false,
            1,
        );
        assert_eq!(asm.state(), AssemblerState::Open);
        for i in 0..6 {
            asm.push_point(pt(f64::from(i) + 1.0, 1.0), i as usize + 2);
        }
        asm.control(&ControlCode::EndLine, false, 8);

        let (geoms, warnings) = asm.finish();
        assert!(warnings.is_empty());
        assert_eq!(geoms.len(), 2);
        let eastings: Vec<f64> = geoms[0].points().iter().map(|p| p.easting).collect();
        assert_eq!(eastings, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn test_multi_line_feeds_already_open_points() {
        let mut asm = GroupAssembler::new();
        asm.control(&start(), false, 1);
        asm.push_point(pt(1.0, 1.0), 2);
        asm.push_point(pt(2.0, 1.0), 3);
        asm.control(
            &ControlCode::MultiLine {
                method: MultiLineMethod::Wave,
                lines: 2,
            },
            false,
            4,
        );
        asm.push_point(pt(3.0, 1.0), 5);
        asm.push_point(pt(4.0, 1.0), 6);
        asm.control(&ControlCode::EndLine, false, 7);

        let (geoms, _) = asm.finish();
        // Vague n=2: 0, 1, 1, 0
        let first: Vec<f64> = geoms[0].points().iter().map(|p| p.easting).collect();
        let second: Vec<f64> = geoms[1].points().iter().map(|p| p.easting).collect();
        assert_eq!(first, vec![1.0, 4.0]);
        assert_eq!(second, vec![2.0, 3.0]);
    }

    #[test]
    fn test_multi_line_small_bucket_warning() {
        let mut asm = GroupAssembler::new();
        asm.control(
            &ControlCode::MultiLine {
                method: MultiLineMethod::Saw,
                lines: 3,
            },
            false,
            1,
        );
        for i in 0..4 {
            asm.push_point(pt(f64::from(i) + 1.0, 1.0), i as usize + 2);
        }
        asm.control(&ControlCode::EndLine, false, 6);

        let (geoms, warnings) = asm.finish();
        assert_eq!(geoms.len(), 1);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].message.contains("segment 1"));
    }

    #[test]
    fn test_multi_line_polygon_uses_first_large_bucket() {
        let mut asm = GroupAssembler::new();
        asm.control(
            &ControlCode::MultiLine {
                method: MultiLineMethod::Saw,
                lines: 2,
            },
            false,
            1,
        );
        for i in 0..6 {
            asm.push_point(pt(f64::from(i) + 1.0, f64::from(i % 3) + 1.0), i as usize + 2);
        }
        asm.control(&ControlCode::ClosePolygon, false, 8);

        let (geoms, _) = asm.finish();
        assert_eq!(geoms.len(), 1);
        let KofGeometry::Polygon(poly) = &geoms[0] else {
            panic!("expected polygon");
        };
        assert_eq!(poly.ring().points[0].easting, 1.0);
        assert_eq!(poly.ring().len(), 4);
    }

    #[test]
    fn test_pending_attributes_consumed_once() {
        let mut asm = GroupAssembler::new();
        let mut attrs = Attributes::new();
        attrs.insert("owner".to_string(), AttrValue::from("NVE"));
        asm.set_pending_attributes(attrs);

        let mut first = pt(1.0, 1.0);
        first
            .attributes
            .insert("owner".to_string(), AttrValue::from("row"));
        asm.push_point(first, 2);
        asm.push_point(pt(2.0, 2.0), 3);

        let (geoms, _) = asm.finish();
        assert_eq!(
            geoms[0].attributes().get("owner"),
            Some(&AttrValue::from("row"))
        );
        assert!(geoms[1].attributes().is_empty());
    }

    #[test]
    fn test_unsupported_control() {
        let mut asm = GroupAssembler::new();
        asm.control(&ControlCode::Unsupported(93), false, 5);
        assert_eq!(asm.state(), AssemblerState::Idle);
        let (_, warnings) = asm.finish();
        assert_eq!(warnings[0].kind, WarningKind::UnsupportedControl);
        assert!(warnings[0].message.contains("09_93"));
    }

    #[test]
    fn test_unknown_control_names_code() {
        let mut asm = GroupAssembler::new();
        asm.control(&ControlCode::Unknown("55".to_string()), false, 7);
        asm.control(&ControlCode::Unknown(String::new()), false, 8);
        let (_, warnings) = asm.finish();
        assert_eq!(warnings[0].kind, WarningKind::UnknownCode);
        assert_eq!(
            warnings[0].message,
            "KOF line 7 has unknown control code '09_55'."
        );
        assert_eq!(
            warnings[1].message,
            "KOF line 8 has unknown control code '09'."
        );
    }

    #[test]
    fn test_folded_polygon_is_degenerate() {
        let mut asm = GroupAssembler::new();
        asm.control(&start(), false, 1);
        asm.push_point(pt(1.0, 1.0), 2);
        asm.push_point(pt(2.0, 1.0), 3);
        asm.push_point(pt(1.0, 1.0), 4);
        asm.control(&ControlCode::ClosePolygon, false, 5);

        let (geoms, warnings) = asm.finish();
        assert!(geoms.is_empty());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::DegenerateGroup);
        assert_eq!(warnings[0].line, 1);
    }
}
