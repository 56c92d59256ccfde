use std::f64::consts::PI;

use euclid::{Point2D, Vector2D};

pub fn rotate<U>(a: &Vector2D<f64, U>, angle: f64) -> Vector2D<f64, U> {
    let cos = angle.cos();
    let sin = angle.sin();
    Vector2D::new(cos * a.x - sin * a.y, sin * a.x + cos * a.y)
}

pub fn perp<U>(a: &Vector2D<f64, U>) -> Vector2D<f64, U> {
    Vector2D::new(-a.y, a.x)
}

pub fn deg2radf(deg: f64) -> f64 {
    deg * PI / 180.0
}

pub fn convert_point_f64<U>(point: &Point2D<i16, U>) -> Point2D<f64, U> {
    Point2D::new(point.x as f64, point.y as f64)
}

pub fn convert_point_i16<U>(point: &Point2D<f64, U>) -> Point2D<i16, U> {
    Point2D::new(point.x as i16, point.y as i16)
}

pub trait MinMax<T> {
    fn max_value(self) -> T;
    fn min_value(self) -> T;
}

impl MinMax<f64> for [f64; 4] {
    fn max_value(self) -> f64 {
        *self
            .iter()
            .max_by(|a, b| a.total_cmp(b))
            .expect("array is not empty")
    }

    fn min_value(self) -> f64 {
        *self
            .iter()
            .min_by(|a, b| a.total_cmp(b))
            .expect("array is not empty")
    }
}
