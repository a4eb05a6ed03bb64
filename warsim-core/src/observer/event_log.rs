//! Game events and the JSONL event log observer.
//!
//! Systems push [`GameEvent`]s as they mutate state; the [`crate::Game`]
//! facade stamps them with the round, faction and phase the command was
//! issued in and hands them to observers.

use super::{ObserverError, SimObserver};
use crate::state::{Phase, UnitId};
use crate::systems::combat::BattleResult;
use serde::{Deserialize, Serialize};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use wardata::{CoalitionId, FactionId, TerritoryId, UnitTypeId};

/// Why a unit left the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestroyCause {
    /// Took its last hit in battle.
    Combat,
    /// Went down with the transport carrying it.
    SunkWithTransport,
    /// Air unit without a legal landing spot at the end of noncombat move.
    Stranded,
    /// Stalemated attacker with nowhere legal to fall back to.
    RetreatBlocked,
}

/// One die thrown in battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DieRoll {
    pub unit: UnitId,
    pub unit_type: UnitTypeId,
    pub roll: u8,
    /// Attack or defense value rolled against.
    pub target: u8,
    pub hit: bool,
}

/// Uses serde's tag format for clean JSONL output:
/// ```json
/// {"type":"territory_captured","territory":"FRA","from":"UK","to":"Germany","unopposed":true}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    UnitMoved {
        unit: UnitId,
        unit_type: UnitTypeId,
        owner: FactionId,
        from: TerritoryId,
        to: TerritoryId,
        moves_left: u32,
        /// Entered a hostile space
        committed: bool,
    },
    CargoLoaded {
        transport: UnitId,
        units: Vec<UnitId>,
        from: TerritoryId,
        sea: TerritoryId,
    },
    CargoUnloaded {
        transport: UnitId,
        units: Vec<UnitId>,
        sea: TerritoryId,
        to: TerritoryId,
    },
    BattleQueued {
        territory: TerritoryId,
        attacker: FactionId,
        #[serde(skip_serializing_if = "Option::is_none")]
        amphibious_from: Option<TerritoryId>,
    },
    BattleStarted {
        territory: TerritoryId,
        attacker: FactionId,
        attackers: usize,
        defenders: usize,
    },
    /// Every die of a round, attackers first, each side in stack order.
    BattleRound {
        territory: TerritoryId,
        round: u32,
        attacker_rolls: Vec<DieRoll>,
        defender_rolls: Vec<DieRoll>,
        attacker_hits: u32,
        defender_hits: u32,
    },
    UnitDamaged {
        unit: UnitId,
        unit_type: UnitTypeId,
        owner: FactionId,
        hit_points: u8,
    },
    UnitDestroyed {
        unit: UnitId,
        unit_type: UnitTypeId,
        owner: FactionId,
        territory: TerritoryId,
        cause: DestroyCause,
    },
    UnitRetreated {
        unit: UnitId,
        from: TerritoryId,
        to: TerritoryId,
    },
    BattleEnded {
        territory: TerritoryId,
        attacker: FactionId,
        result: BattleResult,
        #[serde(skip_serializing_if = "Option::is_none")]
        winner: Option<FactionId>,
        captured: bool,
        rounds: u32,
    },
    TerritoryCaptured {
        territory: TerritoryId,
        #[serde(skip_serializing_if = "Option::is_none")]
        from: Option<FactionId>,
        to: FactionId,
        /// Taken at the end of combat move without dice
        unopposed: bool,
    },
    IncomeCollected {
        faction: FactionId,
        amount: u32,
        treasury: u32,
    },
    PurchaseQueued {
        faction: FactionId,
        unit_type: UnitTypeId,
        count: u32,
        cost: u32,
        treasury: u32,
    },
    PurchasesCleared {
        faction: FactionId,
        refund: u32,
        treasury: u32,
    },
    PurchasePlaced {
        faction: FactionId,
        territory: TerritoryId,
        units: Vec<UnitId>,
    },
    /// Queue left in place at the end of mobilize.
    PurchaseDeferred {
        faction: FactionId,
        reason: String,
    },
    PhaseChanged {
        from: Phase,
        to: Phase,
        /// Faction whose turn it now is
        faction: FactionId,
        round: u32,
    },
    VictoryPointsGained {
        faction: FactionId,
        gained: u32,
        total: u32,
    },
    VictoryPointsToggled {
        enabled: bool,
    },
    VictoryReached {
        coalition: CoalitionId,
        reason: String,
    },
    VictoryRuleChanged {
        rule: String,
    },
}

/// An event stamped with the turn context of the command that caused it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedEvent {
    pub round: u32,
    pub faction: FactionId,
    pub phase: Phase,
    pub event: GameEvent,
}

/// Writes every event as one JSON line.
///
/// # Example
///
/// ```ignore
/// // Standard output (pipe to jq)
/// let observer = EventLogObserver::stdout();
///
/// // File
/// let observer = EventLogObserver::file("events.jsonl")?;
/// ```
pub struct EventLogObserver {
    /// Destination for JSONL output
    writer: Mutex<Box<dyn Write + Send>>,
}

impl EventLogObserver {
    /// Create observer writing to stdout.
    pub fn stdout() -> Self {
        Self::new(Box::new(BufWriter::new(std::io::stdout())))
    }

    /// Create observer writing to a file.
    ///
    /// Uses buffered I/O for performance.
    pub fn file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(BufWriter::new(file))))
    }

    /// Create observer with a custom writer.
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    fn write_event(
        &self,
        writer: &mut dyn Write,
        event: &LoggedEvent,
    ) -> Result<(), ObserverError> {
        serde_json::to_writer(&mut *writer, event)?;
        writeln!(writer)?;
        Ok(())
    }
}

impl SimObserver for EventLogObserver {
    fn on_events(&self, events: &[LoggedEvent]) -> Result<(), ObserverError> {
        if events.is_empty() {
            return Ok(());
        }
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| ObserverError::Render("EventLogObserver writer lock poisoned".into()))?;
        for event in events {
            self.write_event(&mut **writer, event)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "EventLogObserver"
    }

    fn on_shutdown(&self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Arc;

    fn capture_output() -> Arc<Mutex<Cursor<Vec<u8>>>> {
        Arc::new(Mutex::new(Cursor::new(Vec::new())))
    }

    fn stamped(event: GameEvent) -> LoggedEvent {
        LoggedEvent {
            round: 2,
            faction: "Germany".to_string(),
            phase: Phase::CombatMove,
            event,
        }
    }

    #[test]
    fn test_event_serialization_is_stamped_and_tagged() {
        let event = stamped(GameEvent::TerritoryCaptured {
            territory: "FRA".to_string(),
            from: Some("UK".to_string()),
            to: "Germany".to_string(),
            unopposed: true,
        });
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["round"], 2);
        assert_eq!(json["faction"], "Germany");
        assert_eq!(json["phase"], "combat_move");
        assert_eq!(json["event"]["type"], "territory_captured");
        assert_eq!(json["event"]["to"], "Germany");
        assert_eq!(json["event"]["unopposed"], true);
    }

    #[test]
    fn test_optional_fields_skipped() {
        let event = GameEvent::BattleQueued {
            territory: "POL".to_string(),
            attacker: "USSR".to_string(),
            amphibious_from: None,
        };
        let text = serde_json::to_string(&event).unwrap();
        assert!(!text.contains("amphibious_from"));
    }

    #[test]
    fn test_writes_one_line_per_event() {
        let output = capture_output();
        let observer = EventLogObserver::new(Box::new(OutputCapture(output.clone())));

        observer
            .on_events(&[
                stamped(GameEvent::VictoryRuleChanged {
                    rule: "short".to_string(),
                }),
                stamped(GameEvent::IncomeCollected {
                    faction: "Germany".to_string(),
                    amount: 8,
                    treasury: 16,
                }),
            ])
            .unwrap();

        let data = output.lock().unwrap();
        let text = String::from_utf8_lossy(data.get_ref());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"type\":\"victory_rule_changed\""));
        assert!(lines[1].contains("\"amount\":8"));
    }

    #[test]
    fn test_empty_batch_writes_nothing() {
        let output = capture_output();
        let observer = EventLogObserver::new(Box::new(OutputCapture(output.clone())));
        observer.on_events(&[]).unwrap();
        assert!(output.lock().unwrap().get_ref().is_empty());
    }

    /// Helper struct to capture output through Arc<Mutex<Cursor>>
    struct OutputCapture(Arc<Mutex<Cursor<Vec<u8>>>>);

    impl Write for OutputCapture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.0.lock().unwrap().flush()
        }
    }
}
