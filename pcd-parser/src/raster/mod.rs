pub mod geotiff;
