//! Permission schema: the fixed catalog of modules and the actions each one
//! declares, plus the typed permission map stored on every role.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RbacError, Result};

/// Operation a role may be granted within a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::View, Action::Create, Action::Edit, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Create => "create",
            Self::Edit => "edit",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "view" => Ok(Self::View),
            "create" => Ok(Self::Create),
            "edit" => Ok(Self::Edit),
            "delete" => Ok(Self::Delete),
            _ => Err(format!("unknown action: {s}")),
        }
    }
}

/// Functional area of the application that permissions apply to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleId {
    Dashboard,
    Projects,
    Tasks,
    Schedule,
    Materials,
    Employees,
    Users,
    Roles,
    Reports,
    Settings,
}

impl ModuleId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Projects => "projects",
            Self::Tasks => "tasks",
            Self::Schedule => "schedule",
            Self::Materials => "materials",
            Self::Employees => "employees",
            Self::Users => "users",
            Self::Roles => "roles",
            Self::Reports => "reports",
            Self::Settings => "settings",
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ModuleId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        MODULES
            .iter()
            .map(|m| m.id)
            .find(|id| id.as_str() == s)
            .ok_or_else(|| format!("unknown module: {s}"))
    }
}

/// A catalog entry: module identity and the actions it declares, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermissionModule {
    pub id: ModuleId,
    pub name: &'static str,
    pub actions: &'static [Action],
}

impl PermissionModule {
    pub fn declares(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }
}

const CRUD: &[Action] = &[Action::View, Action::Create, Action::Edit, Action::Delete];

pub const MODULES: &[PermissionModule] = &[
    PermissionModule {
        id: ModuleId::Dashboard,
        name: "Dashboard",
        actions: &[Action::View],
    },
    PermissionModule {
        id: ModuleId::Projects,
        name: "Projects",
        actions: CRUD,
    },
    PermissionModule {
        id: ModuleId::Tasks,
        name: "Tasks",
        actions: CRUD,
    },
    PermissionModule {
        id: ModuleId::Schedule,
        name: "Schedule",
        actions: &[Action::View, Action::Edit],
    },
    PermissionModule {
        id: ModuleId::Materials,
        name: "Materials",
        actions: CRUD,
    },
    PermissionModule {
        id: ModuleId::Employees,
        name: "Employees",
        actions: CRUD,
    },
    PermissionModule {
        id: ModuleId::Users,
        name: "Users",
        actions: CRUD,
    },
    PermissionModule {
        id: ModuleId::Roles,
        name: "Roles",
        actions: CRUD,
    },
    PermissionModule {
        id: ModuleId::Reports,
        name: "Reports",
        actions: &[Action::View, Action::Create],
    },
    PermissionModule {
        id: ModuleId::Settings,
        name: "Settings",
        actions: &[Action::View, Action::Edit],
    },
];

/// Full module catalog in fixed display order.
pub fn list_modules() -> &'static [PermissionModule] {
    MODULES
}

pub fn find_module(id: ModuleId) -> Option<&'static PermissionModule> {
    MODULES.iter().find(|m| m.id == id)
}

/// True iff `module` exists in the catalog and declares `action`.
pub fn is_valid_action(module: &str, action: &str) -> bool {
    match (module.parse::<ModuleId>(), action.parse::<Action>()) {
        (Ok(module), Ok(action)) => declares(module, action),
        _ => false,
    }
}

fn declares(module: ModuleId, action: Action) -> bool {
    find_module(module).is_some_and(|m| m.declares(action))
}

/// Untrusted permission map as submitted by a caller, keyed by raw module and
/// action names.
pub type RawPermissions = BTreeMap<String, BTreeMap<String, bool>>;

/// Validated permission map. Every key is a catalog module and every action is
/// one that module declares; missing entries read as `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeMap<ModuleId, BTreeMap<Action, bool>>);

impl PermissionSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every declared action of every module granted.
    pub fn full() -> Self {
        Self::from_grants(
            MODULES
                .iter()
                .flat_map(|m| m.actions.iter().map(move |a| (m.id, *a))),
        )
    }

    pub fn from_grants(grants: impl IntoIterator<Item = (ModuleId, Action)>) -> Self {
        let mut map: BTreeMap<ModuleId, BTreeMap<Action, bool>> = BTreeMap::new();
        for (module, action) in grants {
            if declares(module, action) {
                map.entry(module).or_default().insert(action, true);
            }
        }
        Self(map)
    }

    /// Check a raw map against the catalog. The first unknown module or
    /// undeclared action is reported; nothing is silently dropped.
    pub fn validate(raw: &RawPermissions) -> Result<Self> {
        let mut map: BTreeMap<ModuleId, BTreeMap<Action, bool>> = BTreeMap::new();
        for (module_name, actions) in raw {
            let invalid = |action: &str| RbacError::InvalidPermission {
                module: module_name.clone(),
                action: action.to_string(),
            };
            let Ok(module) = module_name.parse::<ModuleId>() else {
                let first = actions.keys().next().map(String::as_str).unwrap_or("*");
                return Err(invalid(first));
            };
            let entry = map.entry(module).or_default();
            for (action_name, granted) in actions {
                let action = action_name
                    .parse::<Action>()
                    .ok()
                    .filter(|a| declares(module, *a))
                    .ok_or_else(|| invalid(action_name))?;
                entry.insert(action, *granted);
            }
        }
        Ok(Self(map))
    }

    pub fn allows(&self, module: ModuleId, action: Action) -> bool {
        self.0
            .get(&module)
            .and_then(|actions| actions.get(&action))
            .copied()
            .unwrap_or(false)
    }

    /// Number of the module's declared actions that are granted.
    pub fn granted_count(&self, module: &PermissionModule) -> usize {
        module
            .actions
            .iter()
            .filter(|a| self.allows(module.id, **a))
            .count()
    }

    pub fn grants(&self) -> impl Iterator<Item = (ModuleId, Action)> + '_ {
        self.0.iter().flat_map(|(module, actions)| {
            actions
                .iter()
                .filter(|(_, granted)| **granted)
                .map(move |(action, _)| (*module, *action))
        })
    }

    pub fn to_raw(&self) -> RawPermissions {
        self.0
            .iter()
            .map(|(module, actions)| {
                let actions: BTreeMap<String, bool> = actions
                    .iter()
                    .map(|(a, granted)| (a.as_str().to_string(), *granted))
                    .collect();
                (module.as_str().to_string(), actions)
            })
            .collect()
    }
}

/// Permission lookup by raw names. Unknown modules or actions, and actions the
/// module does not declare, are never granted.
pub fn has_permission(permissions: &PermissionSet, module: &str, action: &str) -> bool {
    match (module.parse::<ModuleId>(), action.parse::<Action>()) {
        (Ok(module), Ok(action)) => declares(module, action) && permissions.allows(module, action),
        _ => false,
    }
}
