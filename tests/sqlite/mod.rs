mod associations;
mod conditions;
mod preload;
mod raw;
mod timestamps;
