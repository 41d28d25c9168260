//! Spectrometer modes and the replay layout each one selects.
//!
//! Every mode carries its default replay script (relative to the replay
//! tree), the template of the ROOT file it produces, and the sub-directory of
//! the tape root that file is archived under. Templates use `{run}`,
//! `{segment}` and `{events}` placeholders.

use anyhow::bail;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpectrometerMode {
    HmsAll,
    NpsAll,
    HmsProd,
    NpsProd,
    VldReplay,
    HmsCoin,
    NpsSkim,
    NpsCoin,
    NpsCoinScaler,
    HmsScaler,
    NpsScaler,
}

impl SpectrometerMode {
    pub const ALL: [SpectrometerMode; 11] = [
        SpectrometerMode::HmsAll,
        SpectrometerMode::NpsAll,
        SpectrometerMode::HmsProd,
        SpectrometerMode::NpsProd,
        SpectrometerMode::VldReplay,
        SpectrometerMode::HmsCoin,
        SpectrometerMode::NpsSkim,
        SpectrometerMode::NpsCoin,
        SpectrometerMode::NpsCoinScaler,
        SpectrometerMode::HmsScaler,
        SpectrometerMode::NpsScaler,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SpectrometerMode::HmsAll => "HMS_ALL",
            SpectrometerMode::NpsAll => "NPS_ALL",
            SpectrometerMode::HmsProd => "HMS_PROD",
            SpectrometerMode::NpsProd => "NPS_PROD",
            SpectrometerMode::VldReplay => "VLD_REPLAY",
            SpectrometerMode::HmsCoin => "HMS_COIN",
            SpectrometerMode::NpsSkim => "NPS_SKIM",
            SpectrometerMode::NpsCoin => "NPS_COIN",
            SpectrometerMode::NpsCoinScaler => "NPS_COIN_SCALER",
            SpectrometerMode::HmsScaler => "HMS_SCALER",
            SpectrometerMode::NpsScaler => "NPS_SCALER",
        }
    }

    /// Replay script used when the user does not pass one.
    pub fn default_script(self) -> Option<&'static str> {
        match self {
            SpectrometerMode::HmsAll => Some("SCRIPTS/HMS/PRODUCTION/replay_production_all_hms.C"),
            SpectrometerMode::HmsProd => Some("SCRIPTS/HMS/PRODUCTION/replay_production_hms.C"),
            SpectrometerMode::VldReplay => Some("SCRIPTS/NPS/vld_replay.C"),
            SpectrometerMode::HmsCoin => Some("SCRIPTS/HMS/PRODUCTION/replay_production_hms_coin.C"),
            SpectrometerMode::NpsSkim => Some("SCRIPTS/NPS/replay_production_skim_NPS_HMS.C"),
            SpectrometerMode::NpsCoin => Some("SCRIPTS/NPS/replay_production_coin_NPS_HMS.C"),
            SpectrometerMode::HmsScaler => Some("SCRIPTS/HMS/SCALERS/replay_hms_scalers.C"),
            SpectrometerMode::NpsAll
            | SpectrometerMode::NpsProd
            | SpectrometerMode::NpsCoinScaler
            | SpectrometerMode::NpsScaler => None,
        }
    }

    /// Output ROOT file produced by the replay, relative to the job directory.
    /// `None` for modes whose output layout is not settled yet.
    pub fn output_template(self) -> Option<&'static str> {
        match self {
            SpectrometerMode::HmsAll => {
                Some("ROOTfiles/hms_replay_production_all_{run}_{segment}_{events}.root")
            }
            SpectrometerMode::HmsProd | SpectrometerMode::HmsCoin => Some(
                "ROOTfiles/HMS/PRODUCTION/hms_replay_production_{run}_{segment}_{events}.root",
            ),
            SpectrometerMode::VldReplay => Some("ROOTfiles/nps_{run}.root"),
            SpectrometerMode::NpsSkim => {
                Some("ROOTfiles/COIN/SKIM/nps_hms_skim_{run}_{segment}_{events}.root")
            }
            SpectrometerMode::NpsCoin => {
                Some("ROOTfiles/COIN/PRODUCTION/nps_hms_coin_{run}_{segment}_1_{events}.root")
            }
            SpectrometerMode::HmsScaler => {
                Some("ROOTfiles/HMS/SCALARS/hms_replay_scalars_{run}_{segment}_{events}.root")
            }
            SpectrometerMode::NpsAll
            | SpectrometerMode::NpsProd
            | SpectrometerMode::NpsCoinScaler
            | SpectrometerMode::NpsScaler => None,
        }
    }

    /// Sub-directory of the tape output root.
    pub fn output_path_prefix(self) -> &'static str {
        match self {
            SpectrometerMode::NpsSkim => "production/",
            SpectrometerMode::HmsAll
            | SpectrometerMode::NpsAll
            | SpectrometerMode::HmsProd
            | SpectrometerMode::NpsProd
            | SpectrometerMode::VldReplay
            | SpectrometerMode::HmsCoin
            | SpectrometerMode::NpsCoin
            | SpectrometerMode::NpsCoinScaler
            | SpectrometerMode::HmsScaler
            | SpectrometerMode::NpsScaler => "",
        }
    }

    /// Skim output always covers the whole run.
    pub fn is_full_run_output(self) -> bool {
        match self {
            SpectrometerMode::NpsSkim => true,
            SpectrometerMode::HmsAll
            | SpectrometerMode::NpsAll
            | SpectrometerMode::HmsProd
            | SpectrometerMode::NpsProd
            | SpectrometerMode::VldReplay
            | SpectrometerMode::HmsCoin
            | SpectrometerMode::NpsCoin
            | SpectrometerMode::NpsCoinScaler
            | SpectrometerMode::HmsScaler
            | SpectrometerMode::NpsScaler => false,
        }
    }
}

impl fmt::Display for SpectrometerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpectrometerMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        match Self::ALL.iter().find(|m| m.as_str() == wanted) {
            Some(mode) => Ok(*mode),
            None => {
                let names: Vec<&str> = Self::ALL.iter().map(|m| m.as_str()).collect();
                bail!(
                    "unknown spectrometer {:?}: must be one of {}",
                    s,
                    names.join(", ")
                )
            }
        }
    }
}

/// Fill an output template.
pub fn render_output_name(template: &str, run: u32, segment: u32, events: &str) -> String {
    template
        .replace("{run}", &run.to_string())
        .replace("{segment}", &segment.to_string())
        .replace("{events}", events)
}
