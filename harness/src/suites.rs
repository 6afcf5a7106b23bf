//! Suite assembly: which scenarios each CLI command runs.

use crate::contract;
use crate::layout;
use crate::scenario::{Scenario, Suite};
use crate::workflow;

/// Deployment answers and core outputs exist.
pub fn smoke_suite() -> Suite {
    Suite {
        name: "smoke",
        scenarios: vec![
            Scenario {
                name: "lambda_function_named",
                run: contract::lambda_function_named,
            },
            Scenario {
                name: "hello_world",
                run: contract::hello_world,
            },
        ],
    }
}

/// The registration/verification HTTP contract.
pub fn contract_suite() -> Suite {
    Suite {
        name: "contract",
        scenarios: vec![
            Scenario {
                name: "registration_valid",
                run: contract::registration_valid,
            },
            Scenario {
                name: "verification_success",
                run: contract::verification_success,
            },
            Scenario {
                name: "verification_failure",
                run: contract::verification_failure,
            },
            Scenario {
                name: "registration_invalid",
                run: contract::registration_invalid,
            },
            Scenario {
                name: "verification_invalid",
                run: contract::verification_invalid,
            },
            Scenario {
                name: "idempotency",
                run: contract::idempotency,
            },
            Scenario {
                name: "independence",
                run: contract::independence,
            },
        ],
    }
}

/// Static pipeline and repository-layout checks.
pub fn checks_suite() -> Suite {
    Suite {
        name: "checks",
        scenarios: vec![
            Scenario {
                name: "workflow_structure",
                run: workflow::workflow_structure,
            },
            Scenario {
                name: "terraform_version_consistency",
                run: workflow::terraform_version_consistency,
            },
            Scenario {
                name: "backend_declaration",
                run: layout::backend_declaration,
            },
            Scenario {
                name: "state_layout",
                run: layout::state_layout,
            },
            Scenario {
                name: "state_outputs",
                run: layout::state_outputs,
            },
            Scenario {
                name: "security_scan_wiring",
                run: workflow::security_scan_wiring,
            },
            Scenario {
                name: "modular_layout",
                run: layout::modular_layout,
            },
            Scenario {
                name: "documentation",
                run: layout::documentation,
            },
        ],
    }
}

/// Every suite, in the order the milestones introduced them.
pub fn all_suites() -> Vec<Suite> {
    vec![smoke_suite(), contract_suite(), checks_suite()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suite_names_are_unique_within_each_suite() {
        for suite in all_suites() {
            let mut names: Vec<&str> =
                suite.scenarios.iter().map(|scenario| scenario.name).collect();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), suite.scenarios.len(), "suite {}", suite.name);
        }
    }

    #[test]
    fn contract_suite_registers_all_behavioral_scenarios() {
        let suite = contract_suite();
        let names: Vec<&str> = suite.scenarios.iter().map(|scenario| scenario.name).collect();
        assert_eq!(
            names,
            vec![
                "registration_valid",
                "verification_success",
                "verification_failure",
                "registration_invalid",
                "verification_invalid",
                "idempotency",
                "independence",
            ]
        );
    }
}
