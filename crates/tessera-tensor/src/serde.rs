use crate::{
    boolean::Bool,
    number::{Number, NumberType},
    shape::Shape,
    string::Strings,
};

use serde::ser::SerializeStruct;
use serde::Deserialize;

#[derive(Deserialize)]
struct TensorData<T> {
    data: Vec<T>,
    shape: Vec<usize>,
}

fn serialize_tensor<S, T>(
    serializer: S,
    name: &'static str,
    data: &[T],
    shape: &Shape,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
    T: serde::Serialize,
{
    let mut state = serializer.serialize_struct(name, 2)?;
    state.serialize_field("data", data)?;
    state.serialize_field("shape", shape.sizes())?;
    state.end()
}

impl serde::Serialize for Shape {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serde::Serialize::serialize(self.sizes(), serializer)
    }
}

impl<'de> serde::Deserialize<'de> for Shape {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let sizes = Vec::<usize>::deserialize(deserializer)?;
        Ok(Shape::from(sizes))
    }
}

impl<T> serde::Serialize for Number<T>
where
    T: NumberType + serde::Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let shape = crate::Tensor::shape(self);
        self.with_slice(|data| serialize_tensor(serializer, "Number", data, &shape))
    }
}

impl<'de, T> serde::Deserialize<'de> for Number<T>
where
    T: NumberType + serde::Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let TensorData { data, shape } = TensorData::deserialize(deserializer)?;
        Number::from_shape_vec(&shape, data).map_err(serde::de::Error::custom)
    }
}

impl serde::Serialize for Bool {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serialize_tensor(serializer, "Bool", &self.to_vec(), &crate::Tensor::shape(self))
    }
}

impl<'de> serde::Deserialize<'de> for Bool {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let TensorData { data, shape } = TensorData::deserialize(deserializer)?;
        Bool::from_shape_vec(&shape, data).map_err(serde::de::Error::custom)
    }
}

impl serde::Serialize for Strings {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serialize_tensor(serializer, "Strings", &self.to_vec(), &crate::Tensor::shape(self))
    }
}

impl<'de> serde::Deserialize<'de> for Strings {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let TensorData { data, shape } = TensorData::deserialize(deserializer)?;
        Strings::from_shape_vec(&shape, data).map_err(serde::de::Error::custom)
    }
}
