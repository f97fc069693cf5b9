//! Roles × modules × actions cross-tabulation. Pure projection over a role
//! snapshot and the module catalog.

use std::str::FromStr;

use serde::Serialize;

use crate::permissions::{self, Action, ModuleId, PermissionModule};
use crate::types::Role;

/// Either everything or a single item, parsed from `"all"` or an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<T> {
    All,
    Only(T),
}

impl<T> Selection<T> {
    fn admits(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == value,
        }
    }
}

impl<T: FromStr> FromStr for Selection<T> {
    type Err = T::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Only)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActionSummary {
    pub active: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cell {
    Granted,
    Denied,
    /// The module does not declare this action.
    NotApplicable,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatrixRow {
    pub role_id: String,
    pub role_name: String,
    pub module: ModuleId,
    pub cells: Vec<(Action, Cell)>,
    pub summary: ActionSummary,
}

pub struct PermissionMatrix {
    roles: Vec<Role>,
}

impl PermissionMatrix {
    pub fn new(roles: Vec<Role>) -> Self {
        Self { roles }
    }

    /// Unknown ids select nothing.
    pub fn filter_roles(&self, selection: &Selection<String>) -> Vec<&Role> {
        self.roles
            .iter()
            .filter(|r| selection.admits(&r.id))
            .collect()
    }

    pub fn filter_modules(selection: &Selection<ModuleId>) -> Vec<&'static PermissionModule> {
        permissions::list_modules()
            .iter()
            .filter(|m| selection.admits(&m.id))
            .collect()
    }

    pub fn summarize(role: &Role, module: &PermissionModule) -> ActionSummary {
        ActionSummary {
            active: role.permissions.granted_count(module),
            total: module.actions.len(),
        }
    }

    /// One row per selected role × module, role-major, with a cell for every
    /// action column.
    pub fn rows(
        &self,
        roles: &Selection<String>,
        modules: &Selection<ModuleId>,
    ) -> Vec<MatrixRow> {
        let modules = Self::filter_modules(modules);
        self.filter_roles(roles)
            .into_iter()
            .flat_map(|role| {
                modules.iter().map(move |module| MatrixRow {
                    role_id: role.id.clone(),
                    role_name: role.name.clone(),
                    module: module.id,
                    cells: Action::ALL
                        .iter()
                        .map(|action| (*action, cell(role, module, *action)))
                        .collect(),
                    summary: Self::summarize(role, module),
                })
            })
            .collect()
    }
}

fn cell(role: &Role, module: &PermissionModule, action: Action) -> Cell {
    if !module.declares(action) {
        Cell::NotApplicable
    } else if role.permissions.allows(module.id, action) {
        Cell::Granted
    } else {
        Cell::Denied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::seed::{self, ADMINISTRATOR, EMPLOYEE};

    fn matrix() -> PermissionMatrix {
        PermissionMatrix::new(seed::system_roles())
    }

    #[test]
    fn selection_parses_all_or_id() {
        assert_eq!("all".parse::<Selection<ModuleId>>().unwrap(), Selection::All);
        assert_eq!(
            "tasks".parse::<Selection<ModuleId>>().unwrap(),
            Selection::Only(ModuleId::Tasks)
        );
        assert!("walls".parse::<Selection<ModuleId>>().is_err());
    }

    #[test]
    fn filters_narrow_roles_and_modules() {
        let m = matrix();
        assert_eq!(m.filter_roles(&Selection::All).len(), 3);
        let only = m.filter_roles(&Selection::Only(EMPLOYEE.to_string()));
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].id, EMPLOYEE);
        assert!(m.filter_roles(&Selection::Only("ghost".into())).is_empty());
        assert_eq!(PermissionMatrix::filter_modules(&Selection::All).len(), 10);
        assert_eq!(
            PermissionMatrix::filter_modules(&Selection::Only(ModuleId::Reports))[0].id,
            ModuleId::Reports
        );
    }

    #[test]
    fn summary_never_exceeds_declared_actions() {
        let m = matrix();
        for role in m.filter_roles(&Selection::All) {
            for module in PermissionMatrix::filter_modules(&Selection::All) {
                let s = PermissionMatrix::summarize(role, module);
                assert!(s.active <= s.total);
                assert_eq!(s.total, module.actions.len());
            }
        }
    }

    #[test]
    fn rows_mark_undeclared_actions() {
        let m = matrix();
        let rows = m.rows(
            &Selection::Only(ADMINISTRATOR.to_string()),
            &Selection::Only(ModuleId::Schedule),
        );
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.summary, ActionSummary { active: 2, total: 2 });
        assert_eq!(
            row.cells,
            vec![
                (Action::View, Cell::Granted),
                (Action::Create, Cell::NotApplicable),
                (Action::Edit, Cell::Granted),
                (Action::Delete, Cell::NotApplicable),
            ]
        );
    }

    #[test]
    fn rows_cover_full_cross_product() {
        let m = matrix();
        let rows = m.rows(&Selection::All, &Selection::All);
        assert_eq!(rows.len(), 3 * 10);
        let employee_projects = rows
            .iter()
            .find(|r| r.role_id == EMPLOYEE && r.module == ModuleId::Projects)
            .unwrap();
        assert_eq!(employee_projects.summary, ActionSummary { active: 1, total: 4 });
    }
}
