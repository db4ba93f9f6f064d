pub mod default_loss;
