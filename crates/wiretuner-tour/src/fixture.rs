//! Deterministic large stress fixture generator.
//!
//! Produces a multi-thousand-event document store under a target
//! directory: a `events/` tree (one JSONL file per document) and a
//! `snapshots/` tree taken at fixed intervals, built by actually applying
//! every event through [`wiretuner_core::applier`] as it is appended so
//! the snapshots are exactly what replay would reconstruct.
//!
//! # Determinism
//!
//! Uses xorshift64 with a fixed seed. Same seed, same event count → the
//! same event stream, byte for byte.

use wiretuner_core::applier::{self, ApplierState};
use wiretuner_core::document::Document;
use wiretuner_core::error::Result;
use wiretuner_core::event::{DraftEvent, EventPayload, SelectMode};
use wiretuner_core::ids::{ArtboardId, DocumentId, GroupId, LayerId, ObjectId};
use wiretuner_core::snapshot::{self, SnapshotStore};
use wiretuner_core::store::FileEventStore;
use wiretuner_geom::{AnchorKind, Point, Rectangle, Shape};

/// Fixed seed for the large-stress fixture. Changing this changes the
/// fixture's content; keep it stable across runs.
pub const DEFAULT_SEED: u64 = 0xDEAD_BEEF_CAFE_1234;

/// Xorshift64 PRNG -- deterministic, no external dependencies.
pub struct Rng(u64);

impl Rng {
    pub fn new(seed: u64) -> Self {
        Rng(seed)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    /// Random u64 in `[min, max)`.
    pub fn range(&mut self, min: u64, max: u64) -> u64 {
        min + self.next_u64() % (max - min)
    }

    pub fn chance(&mut self, percent: u64) -> bool {
        self.range(0, 100) < percent
    }

    pub fn point(&mut self, bounds: &Rectangle) -> Point {
        let x = bounds.x + (self.range(0, 1000) as f64 / 1000.0) * bounds.w;
        let y = bounds.y + (self.range(0, 1000) as f64 / 1000.0) * bounds.h;
        Point::new(x, y)
    }
}

/// Configures a generated fixture's shape.
#[derive(Debug, Clone)]
pub struct FixtureConfig {
    pub seed: u64,
    pub target_event_count: u64,
    pub layer_count: u32,
    pub snapshot_every: u64,
    pub batch_size: usize,
    pub base_timestamp_ms: i64,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        FixtureConfig {
            seed: DEFAULT_SEED,
            target_event_count: 12_000,
            layer_count: 4,
            snapshot_every: 2_000,
            batch_size: 200,
            base_timestamp_ms: 1_768_435_200_000,
        }
    }
}

/// Summary of what [`generate`] wrote, for the generator binary's log
/// output and for tests that assert on fixture shape.
#[derive(Debug, Clone)]
pub struct FixtureOutcome {
    pub document_id: DocumentId,
    pub artboard_id: ArtboardId,
    pub event_count: u64,
    pub final_sequence: u64,
    pub snapshot_count: u32,
}

struct LiveObject {
    id: ObjectId,
    layer_id: LayerId,
    is_path: bool,
}

/// Generate a deterministic event stream into `event_store`/`snapshot_store`
/// for a fresh document, applying every event locally as it is appended so
/// periodic snapshots are taken against real reconstructed state.
pub fn generate(
    event_store: &FileEventStore,
    snapshot_store: &SnapshotStore,
    config: &FixtureConfig,
) -> Result<FixtureOutcome> {
    let mut rng = Rng::new(config.seed);
    let document_id = DocumentId::from(format!("stress-{:016x}", config.seed));
    let artboard_id = ArtboardId::from(format!("{:016x}-artboard", config.seed));

    let mut state = ApplierState::new(Document::empty(document_id.clone(), 1));
    let mut now = config.base_timestamp_ms;
    let mut sequence_seen: u64 = 0;
    let mut snapshot_count: u32 = 0;
    let mut live_objects: Vec<LiveObject> = Vec::new();

    let bounds = Rectangle::new(0.0, 0.0, 4000.0, 3000.0);
    let mut drafts = vec![DraftEvent::new(
        document_id.clone(),
        now,
        EventPayload::CreateArtboard {
            artboard_id: artboard_id.clone(),
            name: "Stress Board".to_string(),
            bounds,
        },
    )];

    let mut layer_ids = Vec::with_capacity(config.layer_count as usize);
    for i in 0..config.layer_count {
        let layer_id = LayerId::from(format!("{:016x}-layer-{i}", config.seed));
        now += 10;
        drafts.push(DraftEvent::new(
            document_id.clone(),
            now,
            EventPayload::CreateLayer {
                artboard_id: artboard_id.clone(),
                layer_id: layer_id.clone(),
                name: format!("Layer {i}"),
            },
        ));
        layer_ids.push(layer_id);
    }

    let commit = |event_store: &FileEventStore,
                  state: &mut ApplierState,
                  drafts: Vec<DraftEvent>,
                  sequence_seen: &mut u64|
     -> Result<()> {
        for envelope in event_store.append_batch(drafts, 1_000)? {
            applier::apply(state, &envelope)?;
            *sequence_seen = envelope.event_sequence;
        }
        Ok(())
    };

    commit(event_store, &mut state, drafts, &mut sequence_seen)?;
    let mut last_snapshot_at: u64 = sequence_seen;

    while sequence_seen + 1 < config.target_event_count {
        let mut batch = Vec::with_capacity(config.batch_size);
        for _ in 0..config.batch_size {
            if sequence_seen as usize + batch.len() + 1 >= config.target_event_count as usize {
                break;
            }
            now += rng.range(10, 500) as i64;
            let layer_id = layer_ids[rng.range(0, layer_ids.len() as u64) as usize].clone();

            let payload = if live_objects.is_empty() || rng.chance(40) {
                if rng.chance(60) {
                    let path_id = ObjectId::new();
                    let start = rng.point(&bounds);
                    live_objects.push(LiveObject {
                        id: path_id.clone(),
                        layer_id: layer_id.clone(),
                        is_path: true,
                    });
                    EventPayload::CreatePath {
                        artboard_id: artboard_id.clone(),
                        layer_id,
                        path_id,
                        start,
                    }
                } else {
                    let object_id = ObjectId::new();
                    let shape = match rng.range(0, 4) {
                        0 => Shape::rect(bounds_within(&mut rng, &bounds)),
                        1 => Shape::ellipse(bounds_within(&mut rng, &bounds)),
                        2 => Shape::polygon(bounds_within(&mut rng, &bounds), 5),
                        _ => Shape::star(bounds_within(&mut rng, &bounds), 5, 0.5),
                    };
                    live_objects.push(LiveObject {
                        id: object_id.clone(),
                        layer_id: layer_id.clone(),
                        is_path: false,
                    });
                    EventPayload::CreateShape {
                        artboard_id: artboard_id.clone(),
                        layer_id,
                        object_id,
                        shape,
                    }
                }
            } else {
                let idx = rng.range(0, live_objects.len() as u64) as usize;
                let target = &live_objects[idx];
                if target.is_path && rng.chance(35) {
                    EventPayload::AddAnchor {
                        path_id: target.id.clone(),
                        position: rng.point(&bounds),
                        anchor_type: *pick_anchor_kind(&mut rng),
                        h_out: None,
                        h_in: None,
                    }
                } else {
                    match rng.range(0, 5) {
                        0 => EventPayload::MoveObject {
                            object_id: target.id.clone(),
                            delta: Point::new(
                                rng.range(0, 40) as f64 - 20.0,
                                rng.range(0, 40) as f64 - 20.0,
                            ),
                        },
                        1 => EventPayload::RotateObject {
                            object_id: target.id.clone(),
                            delta_radians: (rng.range(0, 628) as f64 - 314.0) / 1000.0,
                        },
                        2 => EventPayload::ScaleObject {
                            object_id: target.id.clone(),
                            scale_x: 0.9 + (rng.range(0, 200) as f64 / 1000.0),
                            scale_y: 0.9 + (rng.range(0, 200) as f64 / 1000.0),
                        },
                        3 => EventPayload::SelectObjects {
                            object_ids: vec![target.id.clone()],
                            mode: SelectMode::Replace,
                        },
                        _ => EventPayload::ClearSelection {},
                    }
                }
            };

            let draft = DraftEvent::new(document_id.clone(), now, payload);
            let draft = if rng.chance(15) {
                draft.with_undo_group(GroupId::new())
            } else {
                draft
            };
            batch.push(draft);
        }
        if batch.is_empty() {
            break;
        }
        commit(event_store, &mut state, batch, &mut sequence_seen)?;

        if sequence_seen - last_snapshot_at >= config.snapshot_every {
            let snap = snapshot::create(&state.document, sequence_seen, now)?;
            snapshot_store.write(&snap)?;
            snapshot_count += 1;
            last_snapshot_at = sequence_seen;
        }
    }

    Ok(FixtureOutcome {
        document_id,
        artboard_id,
        event_count: sequence_seen + 1,
        final_sequence: sequence_seen,
        snapshot_count,
    })
}

fn bounds_within(rng: &mut Rng, bounds: &Rectangle) -> Rectangle {
    let x = bounds.x + (rng.range(0, 800) as f64 / 1000.0) * bounds.w;
    let y = bounds.y + (rng.range(0, 800) as f64 / 1000.0) * bounds.h;
    let w = 20.0 + (rng.range(0, 200) as f64);
    let h = 20.0 + (rng.range(0, 200) as f64);
    Rectangle::new(x, y, w, h)
}

fn pick_anchor_kind(rng: &mut Rng) -> &'static AnchorKind {
    const KINDS: [AnchorKind; 3] = [AnchorKind::Corner, AnchorKind::Smooth, AnchorKind::Line];
    &KINDS[rng.range(0, KINDS.len() as u64) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn generate_is_deterministic_for_a_fixed_seed() {
        let config = FixtureConfig {
            target_event_count: 500,
            snapshot_every: 100,
            ..FixtureConfig::default()
        };

        let dir_a = tempdir().unwrap();
        let events_a = FileEventStore::open(dir_a.path().join("events")).unwrap();
        let snapshots_a = SnapshotStore::open(dir_a.path().join("snapshots")).unwrap();
        let outcome_a = generate(&events_a, &snapshots_a, &config).unwrap();

        let dir_b = tempdir().unwrap();
        let events_b = FileEventStore::open(dir_b.path().join("events")).unwrap();
        let snapshots_b = SnapshotStore::open(dir_b.path().join("snapshots")).unwrap();
        let outcome_b = generate(&events_b, &snapshots_b, &config).unwrap();

        assert_eq!(outcome_a.event_count, outcome_b.event_count);
        assert_eq!(outcome_a.final_sequence, outcome_b.final_sequence);

        let bytes_a =
            std::fs::read(dir_a.path().join("events").join(format!("{}.jsonl", outcome_a.document_id.0)))
                .unwrap();
        let bytes_b =
            std::fs::read(dir_b.path().join("events").join(format!("{}.jsonl", outcome_b.document_id.0)))
                .unwrap();
        assert_eq!(bytes_a, bytes_b);
    }

    #[test]
    fn generate_reaches_the_requested_event_count_and_takes_snapshots() {
        let config = FixtureConfig {
            target_event_count: 3_000,
            snapshot_every: 500,
            ..FixtureConfig::default()
        };
        let dir = tempdir().unwrap();
        let events = FileEventStore::open(dir.path().join("events")).unwrap();
        let snapshots = SnapshotStore::open(dir.path().join("snapshots")).unwrap();
        let outcome = generate(&events, &snapshots, &config).unwrap();

        assert!(outcome.event_count >= config.target_event_count - config.batch_size as u64);
        assert!(outcome.snapshot_count >= 3);

        let (latest, warnings) = snapshots
            .latest_at_or_before(&outcome.document_id, outcome.final_sequence)
            .unwrap();
        assert!(warnings.is_empty());
        assert!(latest.is_some());
    }
}
