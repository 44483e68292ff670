pub mod ssm;

pub use ssm::SsmClient;
