use gateway_operator::crd::GatewaySet;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&GatewaySet::crd())?);
    Ok(())
}
