pub mod gaussian_actor_critic;
pub mod multi_layer_perceptron;
