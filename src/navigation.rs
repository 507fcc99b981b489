use serde::{Deserialize, Serialize};

pub const DEFAULT_TOURNAMENTS_ROUTE: &str = "/tournaments";
pub const DEFAULT_HOME_ROUTE: &str = "/";

/// Exit offered on the ended screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitAction {
    Tournament,
    Home,
}

/// Caller-supplied exit routes; anything left unset uses the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationTargets {
    pub tournament_id: Option<String>,
    pub tournament_route: Option<String>,
    pub home_route: Option<String>,
}

impl NavigationTargets {
    pub fn resolve(&self, action: ExitAction) -> String {
        match action {
            ExitAction::Tournament => {
                if let Some(route) = non_blank(&self.tournament_route) {
                    return route.to_string();
                }
                match non_blank(&self.tournament_id) {
                    Some(id) => format!("{}/{}", DEFAULT_TOURNAMENTS_ROUTE, id),
                    None => DEFAULT_TOURNAMENTS_ROUTE.to_string(),
                }
            }
            ExitAction::Home => non_blank(&self.home_route)
                .unwrap_or(DEFAULT_HOME_ROUTE)
                .to_string(),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
