use ethers::types::Address;

use super::plan::{ConstructorArg, DeploymentPlan, DeploymentStep};

pub const FUND_VAULT: &str = "FundVault";
pub const GOVERNANCE: &str = "Governance";

/// `FundVault(token)` exposing its two share classes, then
/// `Governance(FundVault)`.
pub fn plan(token_role: &str, token_address: Address) -> DeploymentPlan {
    DeploymentPlan::new()
        .with_step(
            DeploymentStep::new(FUND_VAULT)
                .with_constructor_arg(ConstructorArg::external(
                    token_role,
                    token_address,
                ))
                .with_secondary("ClassA", "classA")
                .with_secondary("ClassB", "classB"),
        )
        .with_step(
            DeploymentStep::new(GOVERNANCE)
                .with_constructor_arg(ConstructorArg::reference(FUND_VAULT)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn governance_depends_on_the_vault() {
        let plan = plan("USDC", Address::repeat_byte(0x0c));
        plan.validate().unwrap();

        let steps = plan.steps();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].artifact, FUND_VAULT);
        assert_eq!(steps[0].secondary.len(), 2);
        assert_eq!(
            steps[1].constructor_args,
            vec![ConstructorArg::reference(FUND_VAULT)]
        );
    }
}
