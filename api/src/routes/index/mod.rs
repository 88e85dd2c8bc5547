pub mod refresh_index_route;
