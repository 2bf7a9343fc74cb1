use std::collections::VecDeque;

use crate::dashboard::{MatchPrediction, Workspace};
use crate::swap::{SwapReport, SwapRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Prediction,
    Swap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictField {
    Home,
    Away,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapField {
    Match,
    Team,
    Out,
    In,
}

impl SwapField {
    const ORDER: [SwapField; 4] = [SwapField::Match, SwapField::Team, SwapField::Out, SwapField::In];

    fn step(self, forward: bool) -> Self {
        let idx = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        let n = Self::ORDER.len();
        let next = if forward { (idx + 1) % n } else { (idx + n - 1) % n };
        Self::ORDER[next]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Picker {
    pub options: Vec<String>,
    pub selected: usize,
}

impl Picker {
    pub fn current(&self) -> Option<&str> {
        self.options.get(self.selected).map(String::as_str)
    }

    pub fn set_options(&mut self, options: Vec<String>) {
        let keep = self.current().map(str::to_string);
        self.options = options;
        self.selected = keep
            .and_then(|k| self.options.iter().position(|o| *o == k))
            .unwrap_or(0);
    }

    pub fn next(&mut self) {
        if !self.options.is_empty() {
            self.selected = (self.selected + 1) % self.options.len();
        }
    }

    pub fn prev(&mut self) {
        if !self.options.is_empty() {
            self.selected = (self.selected + self.options.len() - 1) % self.options.len();
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub tab: Tab,
    pub predict_focus: PredictField,
    pub swap_focus: SwapField,
    pub home: Picker,
    pub away: Picker,
    pub match_id: Picker,
    pub team: Picker,
    pub swap_out: Picker,
    pub swap_in: Picker,
    pub prediction: Option<MatchPrediction>,
    pub swap: Option<SwapReport>,
    pub status: String,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            tab: Tab::Prediction,
            predict_focus: PredictField::Home,
            swap_focus: SwapField::Match,
            home: Picker::default(),
            away: Picker::default(),
            match_id: Picker::default(),
            team: Picker::default(),
            swap_out: Picker::default(),
            swap_in: Picker::default(),
            prediction: None,
            swap: None,
            status: String::new(),
            logs: VecDeque::with_capacity(200),
            help_overlay: false,
        }
    }

    pub fn load(ws: &Workspace) -> Self {
        let mut state = Self::new();
        state.home.set_options(ws.teams());
        state.match_id.set_options(ws.match_ids());
        state.refresh_prediction(ws);
        state.refresh_swap_options(ws);
        state
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    fn set_status(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        self.status = msg.clone();
        self.push_log(msg);
    }

    pub fn toggle_tab(&mut self) {
        self.tab = match self.tab {
            Tab::Prediction => Tab::Swap,
            Tab::Swap => Tab::Prediction,
        };
    }

    pub fn focus_next(&mut self) {
        self.shift_focus(true);
    }

    pub fn focus_prev(&mut self) {
        self.shift_focus(false);
    }

    fn shift_focus(&mut self, forward: bool) {
        match self.tab {
            Tab::Prediction => {
                self.predict_focus = match self.predict_focus {
                    PredictField::Home => PredictField::Away,
                    PredictField::Away => PredictField::Home,
                }
            }
            Tab::Swap => self.swap_focus = self.swap_focus.step(forward),
        }
    }

    pub fn select_next(&mut self, ws: &Workspace) {
        self.move_selection(ws, true);
    }

    pub fn select_prev(&mut self, ws: &Workspace) {
        self.move_selection(ws, false);
    }

    fn move_selection(&mut self, ws: &Workspace, forward: bool) {
        let step = |p: &mut Picker| if forward { p.next() } else { p.prev() };
        match self.tab {
            Tab::Prediction => {
                match self.predict_focus {
                    PredictField::Home => step(&mut self.home),
                    PredictField::Away => step(&mut self.away),
                }
                self.refresh_prediction(ws);
            }
            Tab::Swap => {
                match self.swap_focus {
                    SwapField::Match => step(&mut self.match_id),
                    SwapField::Team => step(&mut self.team),
                    SwapField::Out => step(&mut self.swap_out),
                    SwapField::In => step(&mut self.swap_in),
                }
                // Any change invalidates the last result.
                self.swap = None;
                self.refresh_swap_options(ws);
            }
        }
    }

    pub fn refresh_prediction(&mut self, ws: &Workspace) {
        let home = self.home.current().map(str::to_string);
        let away_opts = ws
            .teams()
            .into_iter()
            .filter(|t| Some(t) != home.as_ref())
            .collect();
        self.away.set_options(away_opts);

        let (Some(home), Some(away)) = (home, self.away.current().map(str::to_string)) else {
            self.prediction = None;
            self.status = "no valid data for this selection".to_string();
            return;
        };
        match ws.predict_match(&home, &away) {
            Ok(p) => {
                self.status = format!("{home} vs {away}: {}", p.prediction.label);
                self.prediction = Some(p);
            }
            Err(err) => {
                self.prediction = None;
                self.status = err.to_string();
            }
        }
    }

    pub fn refresh_swap_options(&mut self, ws: &Workspace) {
        let Some(match_id) = self.match_id.current().map(str::to_string) else {
            self.team.set_options(Vec::new());
            self.swap_out.set_options(Vec::new());
            self.swap_in.set_options(Vec::new());
            return;
        };
        self.team.set_options(ws.teams_in_match(&match_id));
        let Some(team) = self.team.current().map(str::to_string) else {
            self.swap_out.set_options(Vec::new());
            self.swap_in.set_options(Vec::new());
            return;
        };
        self.swap_out.set_options(ws.lineup_players(&match_id, &team));
        self.swap_in.set_options(ws.swap_in_candidates(&match_id, &team));
    }

    pub fn lineup_lines(&self, ws: &Workspace) -> Vec<String> {
        let (Some(match_id), Some(team)) = (self.match_id.current(), self.team.current()) else {
            return Vec::new();
        };
        let rows = ws.lineup(match_id, team);
        if rows.is_empty() {
            return Vec::new();
        }
        let out = self.swap_out.current();
        let mut lines = vec![format!(
            "  {:>3} {:<20} {:<4}{:>4}{:>4}{:>4}{:>4}",
            "#", "Player", "Pos", "G", "SH", "SOG", "A"
        )];
        for p in rows {
            let mark = if Some(p.player.as_str()) == out { '>' } else { ' ' };
            let pos = if p.position.is_empty() { "-" } else { p.position.as_str() };
            lines.push(format!(
                "{mark} {:>3} {:<20} {:<4}{:>4}{:>4}{:>4}{:>4}",
                p.number, p.player, pos, p.goals, p.shots, p.sog, p.assists
            ));
        }
        lines
    }

    pub fn swap_request(&self) -> Option<SwapRequest> {
        Some(SwapRequest {
            match_id: self.match_id.current()?.to_string(),
            team: self.team.current()?.to_string(),
            swap_out: self.swap_out.current()?.to_string(),
            swap_in: self.swap_in.current()?.to_string(),
        })
    }

    pub fn run_swap(&mut self, ws: &Workspace) {
        let Some(req) = self.swap_request() else {
            self.swap = None;
            self.set_status("no valid data for this selection");
            return;
        };
        match ws.simulate_swap(&req) {
            Ok(report) => {
                let before = report.before.probs;
                let after = report.after.probs;
                self.set_status(format!(
                    "[INFO] {} -> {} for {}: win {:.1}% -> {:.1}%",
                    req.swap_out,
                    req.swap_in,
                    req.team,
                    before.win * 100.0,
                    after.win * 100.0
                ));
                if report.incoming.is_none() && !req.is_identity() {
                    self.push_log(format!(
                        "[WARN] {} has no other matches for {}; stats taken as zero",
                        req.swap_in, req.team
                    ));
                }
                self.swap = Some(report);
            }
            Err(err) => {
                self.swap = None;
                self.set_status(format!("[WARN] {err}"));
            }
        }
    }

    pub fn save_swap(&mut self, ws: &Workspace) {
        let Some(report) = &self.swap else {
            self.set_status("[INFO] Run a swap before saving");
            return;
        };
        match ws.save_scenario(report) {
            Ok(path) => self.set_status(format!("[INFO] Saved {}", path.display())),
            Err(err) => self.set_status(format!("[WARN] Save failed: {err:#}")),
        }
    }
}
