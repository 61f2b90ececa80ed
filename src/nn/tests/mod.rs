mod block_attention;
mod block_conv;
mod block_residual;
mod graph_rewrite;
mod node_avg_pool2d;
mod node_fully_connected;
mod node_mat_mul;
