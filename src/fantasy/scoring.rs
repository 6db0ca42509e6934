/// Season totals of one player.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatLine {
    pub pts: f64,
    pub reb: f64,
    pub ast: f64,
    pub stl: f64,
    pub blk: f64,
    pub tov: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub pts: f64,
    pub reb: f64,
    pub ast: f64,
    pub stl: f64,
    pub blk: f64,
    pub tov: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            pts: 1.0,
            reb: 1.2,
            ast: 1.5,
            stl: 3.0,
            blk: 3.0,
            tov: -1.0,
        }
    }
}

impl ScoringWeights {
    pub fn describe(&self) -> String {
        format!(
            "PTS ×{} · REB ×{} · AST ×{} · STL ×{} · BLK ×{} · TOV ×{}",
            self.pts, self.reb, self.ast, self.stl, self.blk, self.tov
        )
    }
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Fantasy points of a stat line, rounded to one decimal.
pub fn fantasy_points(stats: &StatLine, weights: &ScoringWeights) -> f64 {
    round1(
        stats.pts * weights.pts
            + stats.reb * weights.reb
            + stats.ast * weights.ast
            + stats.stl * weights.stl
            + stats.blk * weights.blk
            + stats.tov * weights.tov,
    )
}

/// Points a rostered player has earned for their manager since being acquired.
pub fn earned(current_fp: f64, acquired_fp: f64) -> f64 {
    round1(current_fp - acquired_fp)
}
