//! Fixture catalog data
//!
//! A small SEPOMEX-shaped slice: three states, four municipalities, and
//! settlements covering every resolution shape the resolver distinguishes —
//! a postal code with exactly one settlement, one with several, a settlement
//! with several postal codes, and a catalog anomaly with none.

use domicilio_core::{
    GeoState, Municipality, MunicipalityId, PostalCode, Settlement, SettlementId, SettlementKind,
    StateId,
};

/// Ciudad de México.
pub const CDMX: StateId = StateId(9);
/// Jalisco.
pub const JALISCO: StateId = StateId(14);
/// Estado de México (accented name, for fold tests).
pub const EDOMEX: StateId = StateId(15);

/// Cuauhtémoc, CDMX.
pub const CUAUHTEMOC: MunicipalityId = MunicipalityId(9015);
/// Benito Juárez, CDMX.
pub const BENITO_JUAREZ: MunicipalityId = MunicipalityId(9014);
/// Guadalajara, Jalisco.
pub const GUADALAJARA: MunicipalityId = MunicipalityId(14039);
/// Toluca, Estado de México.
pub const TOLUCA: MunicipalityId = MunicipalityId(15106);

/// Colonia Juárez — the sole settlement of 06600.
pub const COL_JUAREZ: SettlementId = SettlementId(1);
/// Roma Norte — shares 06700 with Roma Sur.
pub const COL_ROMA_NORTE: SettlementId = SettlementId(2);
/// Roma Sur — shares 06700 with Roma Norte.
pub const COL_ROMA_SUR: SettlementId = SettlementId(3);
/// Centro — spans two postal codes (06000, 06010).
pub const COL_CENTRO: SettlementId = SettlementId(4);
/// Doctores — single postal code 06720.
pub const COL_DOCTORES: SettlementId = SettlementId(5);
/// Del Valle Centro, Benito Juárez.
pub const COL_DEL_VALLE: SettlementId = SettlementId(6);
/// Americana, Guadalajara.
pub const COL_AMERICANA: SettlementId = SettlementId(7);
/// Catalog anomaly: a settlement with no postal codes (Cuauhtémoc).
pub const COL_SIN_CODIGO: SettlementId = SettlementId(8);

/// In-memory catalog slice backing [`FixtureCatalogGateway`]
/// (`crate::FixtureCatalogGateway`).
#[derive(Debug, Clone)]
pub struct FixtureCatalog {
    /// All states.
    pub states: Vec<GeoState>,
    /// All municipalities.
    pub municipalities: Vec<Municipality>,
    /// All settlements.
    pub settlements: Vec<Settlement>,
}

fn state(id: StateId, code: &str, name: &str) -> GeoState {
    GeoState {
        id,
        code: code.to_string(),
        name: name.to_string(),
    }
}

fn municipality(id: MunicipalityId, code: &str, name: &str, state_id: StateId) -> Municipality {
    Municipality {
        id,
        code: code.to_string(),
        name: name.to_string(),
        state_id,
    }
}

fn settlement(
    id: SettlementId,
    name: &str,
    kind: SettlementKind,
    municipality_id: MunicipalityId,
    codes: &[&str],
) -> Settlement {
    Settlement {
        id,
        name: name.to_string(),
        kind,
        municipality_id,
        postal_codes: codes
            .iter()
            .map(|c| PostalCode::parse(c).expect("fixture postal code"))
            .collect(),
    }
}

impl FixtureCatalog {
    /// The standard fixture used across the test suite.
    pub fn sepomex_sample() -> Self {
        Self {
            states: vec![
                state(CDMX, "09", "Ciudad de México"),
                state(JALISCO, "14", "Jalisco"),
                state(EDOMEX, "15", "México"),
            ],
            municipalities: vec![
                municipality(CUAUHTEMOC, "015", "Cuauhtémoc", CDMX),
                municipality(BENITO_JUAREZ, "014", "Benito Juárez", CDMX),
                municipality(GUADALAJARA, "039", "Guadalajara", JALISCO),
                municipality(TOLUCA, "106", "Toluca", EDOMEX),
            ],
            settlements: vec![
                settlement(COL_JUAREZ, "Juárez", SettlementKind::Colonia, CUAUHTEMOC, &["06600"]),
                settlement(
                    COL_ROMA_NORTE,
                    "Roma Norte",
                    SettlementKind::Colonia,
                    CUAUHTEMOC,
                    &["06700"],
                ),
                settlement(
                    COL_ROMA_SUR,
                    "Roma Sur",
                    SettlementKind::Colonia,
                    CUAUHTEMOC,
                    &["06700"],
                ),
                settlement(
                    COL_CENTRO,
                    "Centro",
                    SettlementKind::Colonia,
                    CUAUHTEMOC,
                    &["06000", "06010"],
                ),
                settlement(
                    COL_DOCTORES,
                    "Doctores",
                    SettlementKind::Colonia,
                    CUAUHTEMOC,
                    &["06720"],
                ),
                settlement(
                    COL_DEL_VALLE,
                    "Del Valle Centro",
                    SettlementKind::Colonia,
                    BENITO_JUAREZ,
                    &["03100"],
                ),
                settlement(
                    COL_AMERICANA,
                    "Americana",
                    SettlementKind::Colonia,
                    GUADALAJARA,
                    &["44160"],
                ),
                settlement(
                    COL_SIN_CODIGO,
                    "Ampliación Sin Código",
                    SettlementKind::Colonia,
                    CUAUHTEMOC,
                    &[],
                ),
            ],
        }
    }

    /// Look up a state row.
    pub fn state(&self, id: StateId) -> Option<&GeoState> {
        self.states.iter().find(|s| s.id == id)
    }

    /// Look up a municipality row.
    pub fn municipality(&self, id: MunicipalityId) -> Option<&Municipality> {
        self.municipalities.iter().find(|m| m.id == id)
    }

    /// All settlements covered by `code`.
    pub fn settlements_with_code(&self, code: &PostalCode) -> Vec<&Settlement> {
        self.settlements
            .iter()
            .filter(|s| s.postal_codes.contains(code))
            .collect()
    }
}
