//! Shared fixture for the ERS integration tests.
//!
//! Builds a bootstrapped deployment with one manufacturer, one developer
//! registrar and one service, plus helpers that produce the signatures and
//! proofs each flow needs with real Ed25519 keys.

#![allow(dead_code)]

use ers_core::{sha256, Address, Bytes32, ChipId, EnrollmentId, ManufacturerId, Node, RecordType, ServiceId};
use ers_crypto::{KeyPair, MerkleTree};
use ers_registry::digest;
use ers_registry::{
    AddProject, ChipAuthorization, CustodyProof, EnrollmentAuth, EnrollmentMetadata, Ers,
    ManufacturerProof, ManufacturerValidation, NewEnrollment, ProjectClaim, ProjectKind,
    ProtocolConfig, ServiceRecord,
};

pub const BOOTLOADER_URI: &str = "https://boot.acme.test/";
pub const SERVICE_URI: &str = "https://nft.acme.test/chip/";

/// Deterministic key from a one-byte seed.
pub fn key(seed: u8) -> KeyPair {
    KeyPair::from_seed(&[seed; 32])
}

pub struct World {
    pub ers: Ers,
    pub gov: Address,
    pub manufacturer: ManufacturerId,
    pub maker: Address,
    pub developer: Address,
    pub factory: Address,
    pub dev_registrar: Address,
    pub project_key: KeyPair,
    pub project_owner: Address,
    pub service: ServiceId,
    pub service_owner: Address,
}

impl World {
    pub fn new() -> Self {
        Self::with_config(ProtocolConfig::default())
    }

    pub fn with_config(config: ProtocolConfig) -> Self {
        let gov = key(0x60).address();
        let maker = key(0x61).address();
        let developer = key(0x62).address();
        let project_owner = key(0x63).address();
        let service_owner = key(0x64).address();
        let factory = Address::new([0xfa; 20]);
        let manufacturer = ManufacturerId::from_label("acme-silicon");
        let service = ServiceId::from_label("acme-nft");

        let mut ers = Ers::bootstrap(config, gov).expect("bootstrap");
        ers.register_manufacturer(gov, manufacturer, maker)
            .expect("register manufacturer");
        ers.add_registrar_factory(gov, factory).expect("factory");
        ers.add_allowed_developer(gov, developer, "acme")
            .expect("allow developer");
        let dev_registrar = ers
            .create_developer_registrar(developer, factory)
            .expect("developer registrar");
        ers.create_service(
            service_owner,
            service,
            vec![
                ServiceRecord::text(RecordType::from_label("tokenUri"), SERVICE_URI, true),
                ServiceRecord::text(RecordType::from_label("redirectUrl"), "https://acme.test", false),
            ],
        )
        .expect("service");

        Self {
            ers,
            gov,
            manufacturer,
            maker,
            developer,
            factory,
            dev_registrar,
            project_key: key(0x70),
            project_owner,
            service,
            service_owner,
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.ers.chain().chain_id()
    }

    pub fn now(&self) -> u64 {
        self.ers.chain().timestamp()
    }

    /// Enroll `chips` as a merkle-verified batch.
    pub fn enroll_merkle(&mut self, chips: &[ChipId]) -> (EnrollmentId, MerkleTree) {
        let leaves = chips
            .iter()
            .enumerate()
            .map(|(i, c)| digest::manufacturer_leaf(i as u64, c))
            .collect();
        let tree = MerkleTree::new(leaves);
        let id = self
            .ers
            .add_enrollment(
                self.maker,
                self.manufacturer,
                NewEnrollment {
                    auth: EnrollmentAuth::MerkleVerified { root: tree.root() },
                    cert_signer: key(0x65).address(),
                    auth_model: Address::new([0xa0; 20]),
                    metadata: metadata(),
                },
            )
            .expect("merkle enrollment");
        (id, tree)
    }

    /// Enroll a certificate-verified batch signed by `signer`.
    pub fn enroll_signer(&mut self, signer: &KeyPair) -> EnrollmentId {
        self.ers
            .add_enrollment(
                self.maker,
                self.manufacturer,
                NewEnrollment {
                    auth: EnrollmentAuth::SignerVerified,
                    cert_signer: signer.address(),
                    auth_model: Address::new([0xa0; 20]),
                    metadata: metadata(),
                },
            )
            .expect("signer enrollment")
    }

    /// Deploy a project registrar and add it to the developer registrar.
    pub fn add_project(&mut self, label: &str, kind: ProjectKind, root: Bytes32, lockin: u64) -> Address {
        let registrar = self
            .ers
            .deploy_project_registrar(self.project_owner, self.dev_registrar, kind, sha256(label.as_bytes()))
            .expect("deploy project registrar");
        let req = AddProject {
            label: label.to_string(),
            public_key: self.project_key.address(),
            service_id: self.service,
            lockin_period: lockin,
            merkle_root: root,
            ownership_proof: self.ownership_proof(&registrar),
        };
        self.ers
            .add_project(self.developer, self.dev_registrar, registrar, req)
            .expect("add project");
        registrar
    }

    pub fn ownership_proof(&self, registrar: &Address) -> Vec<u8> {
        self.project_key
            .sign_message(&digest::project_ownership(self.chain_id(), registrar))
            .to_bytes()
    }

    pub fn custody(&self, chip: &KeyPair, owner: &Address) -> CustodyProof {
        CustodyProof(
            chip.sign_message(&digest::chip_custody(self.chain_id(), owner))
                .to_bytes(),
        )
    }

    /// The chip's authorisation of `payload`, committed to the current block.
    pub fn chip_auth(&self, chip: &KeyPair, owner: &Address, payload: &Bytes32) -> ChipAuthorization {
        self.chip_auth_at(chip, owner, payload, self.ers.chain().block_number())
    }

    pub fn chip_auth_at(
        &self,
        chip: &KeyPair,
        owner: &Address,
        payload: &Bytes32,
        commit_block: u64,
    ) -> ChipAuthorization {
        let block_hash = self.ers.chain().block_hash(commit_block);
        ChipAuthorization {
            commit_block,
            signature: chip
                .sign_message(&digest::service_change(owner, &block_hash, payload))
                .to_bytes(),
        }
    }

    /// The developer certificate of the project key over `chip`.
    pub fn developer_certificate(&self, chip: &ChipId) -> Vec<u8> {
        self.project_key
            .sign_message(&digest::chip_certificate(chip))
            .to_bytes()
    }

    pub fn node_of(&self, chip: &ChipId) -> Node {
        self.ers
            .registries()
            .chips
            .chip(chip)
            .map(|c| c.node)
            .unwrap_or(Node::ZERO)
    }
}

pub fn metadata() -> EnrollmentMetadata {
    EnrollmentMetadata {
        validation_uri: "https://validate.acme.test/".into(),
        bootloader_uri: BOOTLOADER_URI.into(),
        chip_model: "HaLo-v2".into(),
    }
}

pub fn merkle_validation(enrollment: EnrollmentId, tree: &MerkleTree, index: usize) -> ManufacturerValidation {
    ManufacturerValidation {
        enrollment_id: enrollment,
        proof: ManufacturerProof::Merkle {
            index: index as u64,
            proof: tree.proof(index).expect("manufacturer proof"),
        },
    }
}

/// Claims for `chips` in a project claim tree, with proofs filled in, and
/// the tree's root.
pub fn claim_tree(
    chips: &[ChipId],
    enrollment: &EnrollmentId,
    service: ServiceId,
    lockin: u64,
) -> (Vec<ProjectClaim>, Bytes32) {
    let mut claims: Vec<ProjectClaim> = chips
        .iter()
        .enumerate()
        .map(|(i, chip)| ProjectClaim {
            index: i as u64,
            service_id: service,
            lockin_period: lockin,
            token_uri: format!("https://meta.acme.test/{}", chip.to_hex_unprefixed()),
            proof: Vec::new(),
        })
        .collect();
    let leaves = claims
        .iter()
        .zip(chips)
        .map(|(claim, chip)| claim.leaf(chip, enrollment))
        .collect();
    let tree = MerkleTree::new(leaves);
    for (i, claim) in claims.iter_mut().enumerate() {
        claim.proof = tree.proof(i).expect("claim proof");
    }
    (claims, tree.root())
}
