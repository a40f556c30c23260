//! # Predict Subcommand
//!
//! Computes registrar addresses before deployment. A project operator needs
//! the project registrar's address to sign its ownership proof; a developer
//! can check where a factory will place their developer registrar.

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};
use ers_core::{label_hash, Address, Bytes32};
use ers_registry::deploy::{Deployer, ProjectRegistrarInit};
use ers_registry::developer::DeveloperRegistry;
use ers_registry::{ProjectKind, SystemAddresses};

/// Arguments for `ers predict`.
#[derive(Args, Debug)]
pub struct PredictArgs {
    #[command(subcommand)]
    pub command: PredictCommand,
}

/// Registrar kinds.
#[derive(Subcommand, Debug)]
pub enum PredictCommand {
    /// Address of a project registrar deployed through the shared deployer.
    ProjectRegistrar {
        /// Registrar owner.
        #[arg(long)]
        owner: Address,
        /// Developer registrar the project will join.
        #[arg(long)]
        developer_registrar: Address,
        /// Claim flavour.
        #[arg(long, value_enum, default_value = "merkle-claim")]
        kind: KindArg,
        /// Salt: a 0x-prefixed word, or a label that is hashed.
        #[arg(long)]
        salt: String,
        /// Deployer address (the system deployer when absent).
        #[arg(long)]
        deployer: Option<Address>,
    },
    /// Address of a developer registrar deployed by a factory.
    DeveloperRegistrar {
        /// Registrar factory.
        #[arg(long)]
        factory: Address,
        /// Allowed developer.
        #[arg(long)]
        developer: Address,
        /// Developer's namespace label.
        #[arg(long)]
        label: String,
    },
}

/// Command-line spelling of [`ProjectKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// Registrar-attested chips.
    Attested,
    /// Merkle-claimed chips.
    MerkleClaim,
}

impl From<KindArg> for ProjectKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Attested => ProjectKind::Attested,
            KindArg::MerkleClaim => ProjectKind::MerkleClaim,
        }
    }
}

/// Execute `ers predict`.
pub fn run_predict(args: &PredictArgs) -> Result<u8> {
    let address = predict(&args.command)?;
    println!("{address}");
    Ok(0)
}

/// The predicted address for a command.
pub fn predict(command: &PredictCommand) -> Result<Address> {
    let system = SystemAddresses::derive();
    Ok(match command {
        PredictCommand::ProjectRegistrar {
            owner,
            developer_registrar,
            kind,
            salt,
            deployer,
        } => {
            let deployer = Deployer::new(deployer.unwrap_or(system.deployer));
            let init = ProjectRegistrarInit {
                owner: *owner,
                developer_registrar: *developer_registrar,
                kind: (*kind).into(),
            };
            deployer.predict_project_registrar(&init, &parse_salt(salt)?)
        }
        PredictCommand::DeveloperRegistrar {
            factory,
            developer,
            label,
        } => DeveloperRegistry::new(system.developers)
            .predict_developer_registrar(factory, developer, label),
    })
}

/// A salt given as a 0x-prefixed word or as a label.
pub fn parse_salt(value: &str) -> Result<Bytes32> {
    if value.starts_with("0x") {
        return Ok(Bytes32::from_hex(value)?);
    }
    Ok(label_hash(value.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ers_registry::{Ers, ProtocolConfig};

    const GOV: Address = Address::new([0x60; 20]);

    #[test]
    fn test_project_prediction_matches_deployment() {
        let ers = Ers::bootstrap(ProtocolConfig::default(), GOV).unwrap();
        let owner = Address::new([0x0a; 20]);
        let dev = Address::new([0xd0; 20]);
        let command = PredictCommand::ProjectRegistrar {
            owner,
            developer_registrar: dev,
            kind: KindArg::MerkleClaim,
            salt: "tap".into(),
            deployer: None,
        };
        assert_eq!(
            predict(&command).unwrap(),
            ers.predict_project_registrar(owner, dev, ProjectKind::MerkleClaim, &label_hash(b"tap"))
        );
    }

    #[test]
    fn test_developer_prediction_matches_registry() {
        let ers = Ers::bootstrap(ProtocolConfig::default(), GOV).unwrap();
        let factory = Address::new([0xfa; 20]);
        let developer = Address::new([0xd1; 20]);
        let command = PredictCommand::DeveloperRegistrar {
            factory,
            developer,
            label: "acme".into(),
        };
        assert_eq!(
            predict(&command).unwrap(),
            ers.predict_developer_registrar(&factory, &developer, "acme")
        );
    }

    #[test]
    fn test_parse_salt() {
        let word = Bytes32::new([3; 32]);
        assert_eq!(parse_salt(&word.to_hex()).unwrap(), word);
        assert_eq!(parse_salt("tap").unwrap(), label_hash(b"tap"));
        assert!(parse_salt("0x12").is_err());
    }
}
