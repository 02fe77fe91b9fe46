pub mod provisioner;
pub mod seeder;
pub mod verifier;
