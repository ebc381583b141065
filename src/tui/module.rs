use super::pane::{Column, PaneState, Table, Viewport};

/// Sidebar entries. Each owns what the main pane shows while it is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Module {
    Resources,
    Incidents,
}

const RESOURCE_COLUMNS: &[Column] = &[
    Column {
        title: "Name",
        width: 24,
    },
    Column {
        title: "Type",
        width: 36,
    },
    Column {
        title: "Location",
        width: 16,
    },
];

const PLACEHOLDER_RESOURCES: &[[&str; 3]] = &[
    ["vm-prod-01", "Microsoft.Compute/virtualMachines", "westeurope"],
    ["stlogs01", "Microsoft.Storage/storageAccounts", "eastus"],
    ["pip-web-01", "Microsoft.Network/publicIPAddresses", "westeurope"],
    ["sql-core", "Microsoft.Sql/servers", "swedencentral"],
];

const INCIDENTS_PLACEHOLDER: &str = "Incidents module (main view placeholder)\n\
\n\
No incidents loaded.\n\
Security incidents for the signed-in tenant will be listed here.\n\
\n\
Scroll with ↑/↓, PgUp/PgDn, Home/End or the mouse wheel.";

impl Module {
    pub const ALL: &[Self] = &[Self::Resources, Self::Incidents];

    pub fn name(self) -> &'static str {
        match self {
            Self::Resources => "resources",
            Self::Incidents => "incidents",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Resources => "Azure resources",
            Self::Incidents => "Security incidents",
        }
    }

    /// Title of the main pane while this module is active.
    pub fn title(self) -> &'static str {
        match self {
            Self::Resources => "Resources",
            Self::Incidents => "Incidents",
        }
    }

    /// Fresh main-pane state for this module.
    pub fn main_state(self) -> PaneState {
        match self {
            Self::Resources => PaneState::List(Table::new(
                RESOURCE_COLUMNS.to_vec(),
                PLACEHOLDER_RESOURCES
                    .iter()
                    .map(|row| row.iter().map(|cell| (*cell).to_string()).collect())
                    .collect(),
            )),
            Self::Incidents => PaneState::Content(Viewport::new(INCIDENTS_PLACEHOLDER)),
        }
    }
}

/// The sidebar's list of modules.
pub fn sidebar_state(modules: &[Module]) -> PaneState {
    PaneState::List(Table::new(
        vec![
            Column {
                title: "Modules",
                width: 12,
            },
            Column {
                title: "",
                width: 20,
            },
        ],
        modules
            .iter()
            .map(|m| vec![m.name().to_string(), m.description().to_string()])
            .collect(),
    ))
}
