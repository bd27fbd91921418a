//! Typed rows returned by the upstream endpoints.
//!
//! Field names follow the upstream's PascalCase JSON; optional columns are
//! `Option` and default to `None` when absent.

use serde::{Deserialize, Serialize};

use crate::calendar::GameDate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Team {
    pub season: i32,
    pub team_name: String,
    #[serde(rename = "TeamID")]
    pub team_id: i64,
    pub conf_short: String,
    #[serde(default)]
    pub coach: Option<String>,
    #[serde(default)]
    pub arena: Option<String>,
    #[serde(default)]
    pub arena_city: Option<String>,
    #[serde(default)]
    pub arena_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Conference {
    pub season: i32,
    #[serde(rename = "ConfID")]
    pub conf_id: i64,
    pub conf_short: String,
    pub conf_long: String,
}

/// Live ratings row; `data_through` names the last date included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Rating {
    pub data_through: String,
    pub season: i32,
    pub team_name: String,
    pub conf_short: String,
    #[serde(default)]
    pub coach: Option<String>,
    pub wins: u32,
    pub losses: u32,
    #[serde(rename = "AdjEM")]
    pub adj_em: f64,
    #[serde(rename = "AdjOE")]
    pub adj_oe: f64,
    #[serde(rename = "AdjDE")]
    pub adj_de: f64,
    pub adj_tempo: f64,
    pub tempo: f64,
    #[serde(rename = "SOS")]
    pub sos: f64,
    #[serde(default)]
    pub luck: Option<f64>,
    #[serde(default)]
    pub seed: Option<u32>,
}

/// Archived ratings row as published on `archive_date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ArchiveRating {
    pub archive_date: String,
    pub season: i32,
    pub preseason: String,
    pub team_name: String,
    pub conf_short: String,
    #[serde(rename = "AdjEM")]
    pub adj_em: f64,
    #[serde(rename = "AdjOE")]
    pub adj_oe: f64,
    #[serde(rename = "AdjDE")]
    pub adj_de: f64,
    pub adj_tempo: f64,
    #[serde(default)]
    pub seed: Option<u32>,
}

impl ArchiveRating {
    pub fn archive_date(&self) -> Option<GameDate> {
        GameDate::parse(&self.archive_date).ok()
    }

    pub fn is_preseason(&self) -> bool {
        self.preseason.eq_ignore_ascii_case("true")
    }
}

/// Game prediction from the fanmatch endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FanmatchGame {
    pub season: i32,
    #[serde(rename = "GameID")]
    pub game_id: i64,
    pub date_of_game: String,
    pub visitor: String,
    pub home: String,
    #[serde(default)]
    pub home_rank: Option<u32>,
    #[serde(default)]
    pub visitor_rank: Option<u32>,
    pub home_pred: f64,
    pub visitor_pred: f64,
    #[serde(rename = "HomeWP")]
    pub home_wp: f64,
    pub pred_tempo: f64,
    pub thrill_score: f64,
}

/// Offensive and defensive four factors with raw and adjusted efficiency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FourFactors {
    pub data_through: String,
    pub conf_only: String,
    pub team_name: String,
    pub season: i32,
    #[serde(rename = "eFG_Pct")]
    pub efg_pct: f64,
    #[serde(rename = "RankeFG_Pct")]
    pub rank_efg_pct: u32,
    #[serde(rename = "TO_Pct")]
    pub to_pct: f64,
    #[serde(rename = "RankTO_Pct")]
    pub rank_to_pct: u32,
    #[serde(rename = "OR_Pct")]
    pub or_pct: f64,
    #[serde(rename = "RankOR_Pct")]
    pub rank_or_pct: u32,
    #[serde(rename = "FT_Rate")]
    pub ft_rate: f64,
    #[serde(rename = "RankFT_Rate")]
    pub rank_ft_rate: u32,
    #[serde(rename = "DeFG_Pct")]
    pub d_efg_pct: f64,
    #[serde(rename = "RankDeFG_Pct")]
    pub rank_d_efg_pct: u32,
    #[serde(rename = "DTO_Pct")]
    pub d_to_pct: f64,
    #[serde(rename = "RankDTO_Pct")]
    pub rank_d_to_pct: u32,
    #[serde(rename = "DOR_Pct")]
    pub d_or_pct: f64,
    #[serde(rename = "RankDOR_Pct")]
    pub rank_d_or_pct: u32,
    #[serde(rename = "DFT_Rate")]
    pub d_ft_rate: f64,
    #[serde(rename = "RankDFT_Rate")]
    pub rank_d_ft_rate: u32,
    #[serde(rename = "OE")]
    pub oe: f64,
    #[serde(rename = "RankOE")]
    pub rank_oe: u32,
    #[serde(rename = "DE")]
    pub de: f64,
    #[serde(rename = "RankDE")]
    pub rank_de: u32,
    pub tempo: f64,
    pub rank_tempo: u32,
    #[serde(rename = "AdjOE")]
    pub adj_oe: f64,
    #[serde(rename = "RankAdjOE")]
    pub rank_adj_oe: u32,
    #[serde(rename = "AdjDE")]
    pub adj_de: f64,
    #[serde(rename = "RankAdjDE")]
    pub rank_adj_de: u32,
    pub adj_tempo: f64,
    pub rank_adj_tempo: u32,
}

/// Share of points scored and allowed from free throws, twos and threes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PointDistribution {
    pub data_through: String,
    pub conf_only: String,
    pub season: i32,
    pub team_name: String,
    pub conf_short: String,
    pub off_ft: f64,
    pub rank_off_ft: u32,
    pub off_fg2: f64,
    pub rank_off_fg2: u32,
    pub off_fg3: f64,
    pub rank_off_fg3: u32,
    pub def_ft: f64,
    pub rank_def_ft: u32,
    pub def_fg2: f64,
    pub rank_def_fg2: u32,
    pub def_fg3: f64,
    pub rank_def_fg3: u32,
}

/// Height by position (`hgt1` is the point guard), experience and continuity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Height {
    pub data_through: String,
    pub season: i32,
    pub team_name: String,
    pub conf_short: String,
    pub avg_hgt: f64,
    pub avg_hgt_rank: u32,
    pub hgt_eff: f64,
    pub hgt_eff_rank: u32,
    pub hgt5: f64,
    pub hgt5_rank: u32,
    pub hgt4: f64,
    pub hgt4_rank: u32,
    pub hgt3: f64,
    pub hgt3_rank: u32,
    pub hgt2: f64,
    pub hgt2_rank: u32,
    pub hgt1: f64,
    pub hgt1_rank: u32,
    pub exp: f64,
    pub exp_rank: u32,
    pub bench: f64,
    pub bench_rank: u32,
    pub continuity: f64,
    pub rank_continuity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MiscStats {
    pub data_through: String,
    pub conf_only: String,
    pub season: i32,
    pub team_name: String,
    pub conf_short: String,
    #[serde(rename = "FG3Pct")]
    pub fg3_pct: f64,
    #[serde(rename = "RankFG3Pct")]
    pub rank_fg3_pct: u32,
    #[serde(rename = "FG2Pct")]
    pub fg2_pct: f64,
    #[serde(rename = "RankFG2Pct")]
    pub rank_fg2_pct: u32,
    #[serde(rename = "FTPct")]
    pub ft_pct: f64,
    #[serde(rename = "RankFTPct")]
    pub rank_ft_pct: u32,
    pub block_pct: f64,
    pub rank_block_pct: u32,
    pub stl_rate: f64,
    pub rank_stl_rate: u32,
    #[serde(rename = "NSTRate")]
    pub nst_rate: f64,
    #[serde(rename = "RankNSTRate")]
    pub rank_nst_rate: u32,
    pub a_rate: f64,
    pub rank_a_rate: u32,
    #[serde(rename = "F3GRate")]
    pub f3g_rate: f64,
    #[serde(rename = "RankF3GRate")]
    pub rank_f3g_rate: u32,
    #[serde(rename = "AdjOE")]
    pub adj_oe: f64,
    #[serde(rename = "RankAdjOE")]
    pub rank_adj_oe: u32,
    #[serde(rename = "OppFG3Pct")]
    pub opp_fg3_pct: f64,
    #[serde(rename = "RankOppFG3Pct")]
    pub rank_opp_fg3_pct: u32,
    #[serde(rename = "OppFG2Pct")]
    pub opp_fg2_pct: f64,
    #[serde(rename = "RankOppFG2Pct")]
    pub rank_opp_fg2_pct: u32,
    #[serde(rename = "OppFTPct")]
    pub opp_ft_pct: f64,
    #[serde(rename = "RankOppFTPct")]
    pub rank_opp_ft_pct: u32,
    pub opp_block_pct: f64,
    pub rank_opp_block_pct: u32,
    pub opp_stl_rate: f64,
    pub rank_opp_stl_rate: u32,
    #[serde(rename = "OppNSTRate")]
    pub opp_nst_rate: f64,
    #[serde(rename = "RankOppNSTRate")]
    pub rank_opp_nst_rate: u32,
    pub opp_a_rate: f64,
    pub rank_opp_a_rate: u32,
    #[serde(rename = "OppF3GRate")]
    pub opp_f3g_rate: f64,
    #[serde(rename = "RankOppF3GRate")]
    pub rank_opp_f3g_rate: u32,
    #[serde(rename = "AdjDE")]
    pub adj_de: f64,
    #[serde(rename = "RankAdjDE")]
    pub rank_adj_de: u32,
}
