pub mod mesh_baker;
