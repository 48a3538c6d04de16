//! Typed configuration loading and validation.
//!
//! The on-disk format is a flat JSON record; [`Config`] mirrors it field for
//! field via `serde`, then [`Config::validate`] enforces the cross-field
//! invariants the generators depend on before any output file is touched.

use std::{fs, path::Path};

use serde::Deserialize;

use crate::error::ConfigError;

/// A fully loaded and validated generator configuration.
///
/// Constructed only via [`Config::load`], which validates before returning,
/// so a `Config` in hand is always safe to pass to the generators.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Number of investor vertices, `N_inv`.
    pub number_of_investors: u64,
    /// Number of company vertices, `N_co`.
    pub number_of_companies: u64,
    /// Target number of friend edges, `E_f`.
    pub number_of_friend_edges: u64,
    /// Target number of mirror edges, `E_m`.
    pub number_of_mirror_edges: u64,

    /// Power-law shape parameter for the follower rank, `a_f`.
    pub follower_list_friend_power_dis_param: f64,
    /// Power-law shape parameter for `leader_list_1`, `a_1`.
    pub leader_list_1_friend_power_dis_param: f64,
    /// Power-law shape parameter for `leader_list_2`, `a_2`.
    pub leader_list_2_friend_power_dis_param: f64,
    /// Probability of drawing the leader from `leader_list_1` rather than
    /// `leader_list_2`, `p_1`.
    pub choose_leader_list_1_as_friend_prob: f64,

    /// Power-law shape parameter for the mirror follower rank, `a_m`.
    pub follower_list_mirror_power_dis_param: f64,
    /// Probability a considered friend pair is mirrored, `P_mirror`.
    pub follower_mirrors_a_friend_probability: f64,
    /// Probability a mirrored pair is also marked for removal, `P_remove`.
    pub follower_removes_a_mirror_probability: f64,

    /// Output path for investor names.
    pub investor_name_file_name: String,
    /// Output path for trade-book investment amounts.
    pub tradebook_investment_amount_file_name: String,
    /// Output path for company names.
    pub company_name_file_name: String,
    /// Output path for the company ID list.
    pub company_list_file_name: String,
    /// Output path for the follower permutation.
    pub follower_list_file_name: String,
    /// Output path for the `leader_list_1` permutation.
    pub leader_list_1_file_name: String,
    /// Output path for the `leader_list_2` permutation.
    pub leader_list_2_file_name: String,
    /// Output path for friend edges.
    pub friend_edges_file_name: String,
    /// Output path for mirror edges.
    pub mirror_edges_file_name: String,
    /// Output path for remove-mirror edges.
    pub remove_mirror_edges_file_name: String,
}

impl Config {
    /// Reads and parses `path`, then validates the result.
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Malformed`] if it is not valid JSON or is missing a
    /// required key, or any of the invariant-violation variants from
    /// [`Config::validate`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every cross-field invariant from the data model.
    ///
    /// # Errors
    /// Returns the specific [`ConfigError`] variant describing the first
    /// invariant violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.number_of_investors == 0 {
            return Err(ConfigError::ZeroCardinality {
                field: "number_of_investors",
            });
        }
        if self.number_of_companies == 0 {
            return Err(ConfigError::ZeroCardinality {
                field: "number_of_companies",
            });
        }
        if self.number_of_friend_edges == 0 {
            return Err(ConfigError::ZeroCardinality {
                field: "number_of_friend_edges",
            });
        }

        let max_possible = max_pairs(self.number_of_investors);
        if self.number_of_friend_edges > max_possible {
            return Err(ConfigError::TooManyFriendEdges {
                requested: self.number_of_friend_edges,
                max_possible,
                number_of_investors: self.number_of_investors,
            });
        }

        for (field, value) in [
            (
                "choose_leader_list_1_as_friend_prob",
                self.choose_leader_list_1_as_friend_prob,
            ),
            (
                "follower_mirrors_a_friend_probability",
                self.follower_mirrors_a_friend_probability,
            ),
            (
                "follower_removes_a_mirror_probability",
                self.follower_removes_a_mirror_probability,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ProbabilityOutOfRange { field, value });
            }
        }

        for (field, value) in [
            (
                "follower_list_friend_power_dis_param",
                self.follower_list_friend_power_dis_param,
            ),
            (
                "leader_list_1_friend_power_dis_param",
                self.leader_list_1_friend_power_dis_param,
            ),
            (
                "leader_list_2_friend_power_dis_param",
                self.leader_list_2_friend_power_dis_param,
            ),
            (
                "follower_list_mirror_power_dis_param",
                self.follower_list_mirror_power_dis_param,
            ),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::NonPositiveShapeParameter { field, value });
            }
        }

        #[allow(
            clippy::cast_precision_loss,
            reason = "edge counts stay well within f64's exact integer range for this workload"
        )]
        let bound = self.number_of_friend_edges as f64 * self.follower_mirrors_a_friend_probability;
        #[allow(
            clippy::cast_precision_loss,
            reason = "edge counts stay well within f64's exact integer range for this workload"
        )]
        let requested = self.number_of_mirror_edges as f64;
        if requested >= bound {
            return Err(ConfigError::TooManyMirrorEdges {
                requested: self.number_of_mirror_edges,
                friend_edges: self.number_of_friend_edges,
                probability: self.follower_mirrors_a_friend_probability,
            });
        }

        Ok(())
    }
}

/// `C(n, 2)`, the number of distinct unordered pairs over `n` vertices.
fn max_pairs(n: u64) -> u64 {
    n.saturating_mul(n.saturating_sub(1)) / 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    fn valid_json() -> serde_json::Value {
        serde_json::json!({
            "number_of_investors": 1000,
            "number_of_companies": 200,
            "number_of_friend_edges": 1000,
            "number_of_mirror_edges": 100,
            "follower_list_friend_power_dis_param": 2.0,
            "leader_list_1_friend_power_dis_param": 2.0,
            "leader_list_2_friend_power_dis_param": 2.0,
            "choose_leader_list_1_as_friend_prob": 0.5,
            "follower_list_mirror_power_dis_param": 2.0,
            "follower_mirrors_a_friend_probability": 0.5,
            "follower_removes_a_mirror_probability": 0.25,
            "investor_name_file_name": "investors.csv",
            "tradebook_investment_amount_file_name": "tradebooks.csv",
            "company_name_file_name": "companies.csv",
            "company_list_file_name": "company_list.csv",
            "follower_list_file_name": "follower_list.csv",
            "leader_list_1_file_name": "leader_list_1.csv",
            "leader_list_2_file_name": "leader_list_2.csv",
            "friend_edges_file_name": "friend_edges.csv",
            "mirror_edges_file_name": "mirror_edges.csv",
            "remove_mirror_edges_file_name": "remove_mirror_edges.csv",
        })
    }

    #[test]
    fn loads_and_validates_a_well_formed_file() {
        let dir = tempfile::tempdir().expect("tempdir must be creatable");
        let path = dir.path().join("config.json");
        let mut file = std::fs::File::create(&path).expect("file must be creatable");
        write!(file, "{}", valid_json()).expect("write must succeed");

        let config = Config::load(&path).expect("well-formed config must load");
        assert_eq!(config.number_of_investors, 1000);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Config::load("/nonexistent/path/config.json").expect_err("must fail");
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn malformed_json_is_a_malformed_error() {
        let dir = tempfile::tempdir().expect("tempdir must be creatable");
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").expect("write must succeed");

        let err = Config::load(&path).expect_err("must fail");
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }

    #[rstest]
    #[case("number_of_investors", 0)]
    #[case("number_of_companies", 0)]
    #[case("number_of_friend_edges", 0)]
    fn zero_cardinality_fields_are_rejected(#[case] field: &str, #[case] value: u64) {
        let mut json = valid_json();
        json[field] = serde_json::json!(value);
        let config: Config = serde_json::from_value(json).expect("deserialize must succeed");

        let err = config.validate().expect_err("must fail");
        assert!(matches!(err, ConfigError::ZeroCardinality { .. }));
    }

    #[test]
    fn too_many_friend_edges_is_rejected() {
        let mut json = valid_json();
        json["number_of_investors"] = serde_json::json!(5);
        json["number_of_friend_edges"] = serde_json::json!(100);
        let config: Config = serde_json::from_value(json).expect("deserialize must succeed");

        let err = config.validate().expect_err("must fail");
        assert!(matches!(err, ConfigError::TooManyFriendEdges { .. }));
    }

    #[rstest]
    #[case("choose_leader_list_1_as_friend_prob", -0.1)]
    #[case("follower_mirrors_a_friend_probability", 1.1)]
    fn out_of_range_probabilities_are_rejected(#[case] field: &str, #[case] value: f64) {
        let mut json = valid_json();
        json[field] = serde_json::json!(value);
        let config: Config = serde_json::from_value(json).expect("deserialize must succeed");

        let err = config.validate().expect_err("must fail");
        assert!(matches!(err, ConfigError::ProbabilityOutOfRange { .. }));
    }

    #[test]
    fn non_positive_shape_parameter_is_rejected() {
        let mut json = valid_json();
        json["follower_list_friend_power_dis_param"] = serde_json::json!(0.0);
        let config: Config = serde_json::from_value(json).expect("deserialize must succeed");

        let err = config.validate().expect_err("must fail");
        assert!(matches!(err, ConfigError::NonPositiveShapeParameter { .. }));
    }

    #[test]
    fn too_many_mirror_edges_is_rejected() {
        let mut json = valid_json();
        json["number_of_friend_edges"] = serde_json::json!(100);
        json["follower_mirrors_a_friend_probability"] = serde_json::json!(0.5);
        json["number_of_mirror_edges"] = serde_json::json!(50);
        let config: Config = serde_json::from_value(json).expect("deserialize must succeed");

        let err = config.validate().expect_err("must fail");
        assert!(matches!(err, ConfigError::TooManyMirrorEdges { .. }));
    }
}
