use glam::{UVec3, Vec3};

pub fn box_volume(extent: &UVec3) -> u64 {
    extent.to_array().iter().map(|&e| e as u64).product()
}

/// Component-wise `ceil(a / b)`.
pub fn div_ceil(a: UVec3, b: UVec3) -> UVec3 {
    let remainder = UVec3::select((a % b).cmpne(UVec3::ZERO), UVec3::ONE, UVec3::ZERO);
    a / b + remainder
}

pub trait IndexToSubscript {
    type Size;

    fn index_to_subscript(&self, index: u32) -> Self::Size;
}

pub trait SubscriptToIndex<Size = Self> {
    fn to_index(&self, size: &Size) -> u32;
}

pub trait ToSubscript {
    type Subscript;

    fn to_subscript(&self, size: Self::Subscript) -> Self::Subscript;
}

impl IndexToSubscript for UVec3 {
    type Size = Self;

    fn index_to_subscript(&self, index: u32) -> Self::Size {
        let x = index % self.x;
        let y = (index - x) / self.x % self.y;
        let z = ((index - x) / self.x - y) / self.y;
        UVec3::new(x, y, z)
    }
}

impl SubscriptToIndex for UVec3 {
    fn to_index(&self, size: &Self) -> u32 {
        self.x + size.x * (self.y + size.y * self.z)
    }
}

impl ToSubscript for Vec3 {
    type Subscript = UVec3;

    /// Maps a point in block units to the subscript of the block containing it.
    /// Components are clamped to `[0, size - 1]`.
    fn to_subscript(&self, size: Self::Subscript) -> Self::Subscript {
        let floored = self.floor().max(Vec3::ZERO);
        UVec3::new(
            (floored.x as u32).min(size.x - 1),
            (floored.y as u32).min(size.y - 1),
            (floored.z as u32).min(size.z - 1),
        )
    }
}
